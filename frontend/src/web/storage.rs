//! LocalStorage 封装模块
//!
//! 基于 `gloo-storage` 的原始 `Storage` 句柄读写字符串，
//! 不经过 JSON 编码（token 等值按原样保存）。

use crate::session::{KeyValueStore, SessionRepository};
use gloo_storage::{LocalStorage, Storage};

/// 浏览器 LocalStorage
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserStore;

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Option<String> {
        LocalStorage::raw().get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) -> bool {
        let ok = LocalStorage::raw().set_item(key, value).is_ok();
        if !ok {
            log::warn!("[Storage] cannot write {}", key);
        }
        ok
    }

    fn remove(&self, key: &str) -> bool {
        LocalStorage::raw().remove_item(key).is_ok()
    }
}

pub type BrowserSession = SessionRepository<BrowserStore>;

/// 浏览器中的会话仓库
pub fn browser_session() -> BrowserSession {
    SessionRepository::new(BrowserStore)
}
