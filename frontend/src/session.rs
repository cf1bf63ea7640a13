//! 会话持久化
//!
//! token、当前用户、最后活动时间和上次使用的客户名保存在键值存储中
//! （浏览器里是 LocalStorage）。`SessionRepository` 是唯一读写这些键的地方。

pub mod activity;

use crate::api::TokenSource;
use bobinas_shared::{Session, SessionUser, Timestamp};
use std::time::Duration;

pub const KEY_TOKEN: &str = "bobinas_token";
pub const KEY_USER: &str = "bobinas_user";
pub const KEY_LAST_ACTIVITY: &str = "bobinas_last_activity";
pub const KEY_LAST_CLIENTE: &str = "bobinas_last_cliente";

/// 会话结束的原因，登录页据此显示不同提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Manual,
    Inactivity,
    /// 受保护接口返回 401
    Unauthorized,
}

impl LogoutReason {
    pub fn query_marker(&self) -> Option<&'static str> {
        match self {
            LogoutReason::Manual => None,
            LogoutReason::Inactivity => Some("inactividad"),
            LogoutReason::Unauthorized => Some("sesion_expirada"),
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "inactividad" => Some(LogoutReason::Inactivity),
            "sesion_expirada" => Some(LogoutReason::Unauthorized),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&'static str> {
        match self {
            LogoutReason::Manual => None,
            LogoutReason::Inactivity => {
                Some("Su sesión se cerró por inactividad. Inicie sesión nuevamente.")
            }
            LogoutReason::Unauthorized => {
                Some("Su sesión expiró o no es válida. Inicie sesión nuevamente.")
            }
        }
    }
}

/// 字符串键值存储
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> bool;
    fn remove(&self, key: &str) -> bool;
}

/// 启动时恢复会话的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Restored {
    Active(Session),
    /// 存储中有会话，但最后活动时间已超过不活动窗口
    Expired,
    None,
}

#[derive(Debug, Clone, Default)]
pub struct SessionRepository<S> {
    store: S,
}

impl<S: KeyValueStore> SessionRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Option<Session> {
        let token = self.store.get(KEY_TOKEN).filter(|t| !t.is_empty())?;
        let user: SessionUser = self
            .store
            .get(KEY_USER)
            .and_then(|raw| serde_json_wasm::from_str(&raw).ok())?;
        let last_activity = self
            .store
            .get(KEY_LAST_ACTIVITY)
            .and_then(|raw| Timestamp::parse(&raw))
            .unwrap_or_default();
        Some(Session {
            token,
            user,
            last_activity,
        })
    }

    /// 读取会话并按不活动窗口判断是否仍然有效，过期则清除
    pub fn restore(&self, now: Timestamp, window: Duration) -> Restored {
        match self.load() {
            None => Restored::None,
            Some(session) if now - session.last_activity >= window => {
                log::info!("[Session] stored session idle for too long, discarding");
                self.clear();
                Restored::Expired
            }
            Some(session) => Restored::Active(session),
        }
    }

    pub fn save(&self, session: &Session) -> bool {
        let user = match serde_json_wasm::to_string(&session.user) {
            Ok(json) => json,
            Err(e) => {
                log::error!("[Session] cannot serialize user: {}", e);
                return false;
            }
        };
        self.store.set(KEY_TOKEN, &session.token)
            && self.store.set(KEY_USER, &user)
            && self.touch(session.last_activity)
    }

    pub fn touch(&self, now: Timestamp) -> bool {
        self.store
            .set(KEY_LAST_ACTIVITY, &now.as_millis().to_string())
    }

    pub fn last_activity(&self) -> Option<Timestamp> {
        self.store
            .get(KEY_LAST_ACTIVITY)
            .and_then(|raw| Timestamp::parse(&raw))
    }

    /// 清除会话相关的键；上次使用的客户名保留
    pub fn clear(&self) {
        for key in [KEY_TOKEN, KEY_USER, KEY_LAST_ACTIVITY] {
            self.store.remove(key);
        }
    }

    pub fn remember_cliente(&self, cliente: &str) {
        let cliente = cliente.trim();
        if !cliente.is_empty() {
            self.store.set(KEY_LAST_CLIENTE, cliente);
        }
    }

    pub fn last_cliente(&self) -> Option<String> {
        self.store.get(KEY_LAST_CLIENTE).filter(|c| !c.is_empty())
    }
}

impl<S: KeyValueStore + Send + Sync> TokenSource for SessionRepository<S> {
    fn token(&self) -> Option<String> {
        self.store.get(KEY_TOKEN).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::KeyValueStore;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// 内存键值存储，仅用于测试
    #[derive(Default)]
    pub struct MemoryStore {
        data: Mutex<HashMap<String, String>>,
    }

    impl KeyValueStore for MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            self.data.lock().unwrap().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) -> bool {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            true
        }

        fn remove(&self, key: &str) -> bool {
            self.data.lock().unwrap().remove(key).is_some()
        }
    }

    impl KeyValueStore for &MemoryStore {
        fn get(&self, key: &str) -> Option<String> {
            (**self).get(key)
        }

        fn set(&self, key: &str, value: &str) -> bool {
            (**self).set(key, value)
        }

        fn remove(&self, key: &str) -> bool {
            (**self).remove(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use bobinas_shared::Role;

    fn session(at: i64) -> Session {
        Session {
            token: "tok-1".into(),
            user: SessionUser {
                id: 5,
                username: "ana".into(),
                role: Role::Embarcador,
            },
            last_activity: Timestamp::new(at),
        }
    }

    #[test]
    fn save_then_load() {
        let store = MemoryStore::default();
        let repo = SessionRepository::new(&store);
        assert!(repo.save(&session(1_000)));

        assert_eq!(repo.load(), Some(session(1_000)));
        assert_eq!(repo.token(), Some("tok-1".to_string()));
    }

    #[test]
    fn clear_keeps_remembered_cliente() {
        let store = MemoryStore::default();
        let repo = SessionRepository::new(&store);
        repo.save(&session(1_000));
        repo.remember_cliente(" Acme ");

        repo.clear();

        assert_eq!(repo.load(), None);
        assert_eq!(repo.token(), None);
        assert_eq!(repo.last_activity(), None);
        assert_eq!(repo.last_cliente(), Some("Acme".to_string()));
    }

    #[test]
    fn restore_discards_idle_session() {
        let store = MemoryStore::default();
        let repo = SessionRepository::new(&store);
        let window = Duration::from_millis(180_000);
        repo.save(&session(10_000));

        assert_eq!(
            repo.restore(Timestamp::new(10_000 + 179_999), window),
            Restored::Active(session(10_000))
        );
        assert_eq!(
            repo.restore(Timestamp::new(10_000 + 180_000), window),
            Restored::Expired
        );
        assert_eq!(repo.load(), None);
        assert_eq!(repo.restore(Timestamp::new(0), window), Restored::None);
    }

    #[test]
    fn corrupt_user_is_treated_as_no_session() {
        let store = MemoryStore::default();
        store.set(KEY_TOKEN, "tok");
        store.set(KEY_USER, "{not json");
        let repo = SessionRepository::new(&store);
        assert_eq!(repo.load(), None);
    }
}
