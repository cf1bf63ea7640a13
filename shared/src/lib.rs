use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod date;
pub mod protocol;
pub mod validation;

pub use date::Timestamp;
pub use validation::{AcceptanceRule, HU_LENGTH, ValidationError};

// =========================================================
// 常量定义 (Constants)
// =========================================================

/// 客户没有保留规则时后端使用的默认天数
pub const DEFAULT_RETENTION_DAYS: u32 = 90;

/// 剩余天数不超过该值时显示为即将到期
pub const EXPIRING_SOON_DAYS: i64 = 7;

// =========================================================
// 用户与会话 (Users & Session)
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Ingeniero,
    #[default]
    Embarcador,
    Lider,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Ingeniero, Role::Embarcador, Role::Lider];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Ingeniero => "ingeniero",
            Role::Embarcador => "embarcador",
            Role::Lider => "lider",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::Ingeniero => "Ingeniero",
            Role::Embarcador => "Embarcador",
            Role::Lider => "Líder",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

/// 后端返回的用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub role: Role,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

/// 持久化在 LocalStorage 中的当前用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: u64,
    #[serde(default)]
    pub username: String,
    pub role: Role,
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
        }
    }
}

/// 一次登录产生的会话
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
    pub last_activity: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    #[serde(rename = "userId", alias = "user_id")]
    pub user_id: u64,
    #[serde(default)]
    pub username: Option<String>,
}

/// 第二位用户（líder）的凭据
///
/// 验证接口收 JSON `{username, password}`；替换写入时由 multipart
/// 字段 `lider_username` / `lider_password` 携带。`Debug` 不输出密码。
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LeadCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl LeadCredentials {
    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadVerification {
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub username: Option<String>,
}

// =========================================================
// Bobinas
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bobina {
    pub id: u64,
    pub hu: String,
    pub cliente: String,
    #[serde(default, alias = "fotoUrl")]
    pub foto_url: Option<String>,
    #[serde(default, alias = "fechaEmbarque")]
    pub fecha_embarque: Option<String>,
    #[serde(default, alias = "diasRestantes")]
    pub dias_restantes: Option<i64>,
    #[serde(default, alias = "fechaReemplazo")]
    pub fecha_reemplazo: Option<String>,
    #[serde(default)]
    pub reemplazador: Option<String>,
    #[serde(default)]
    pub aprobador: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionStatus {
    Expired,
    ExpiringSoon,
    Active,
    Unknown,
}

impl RetentionStatus {
    pub fn from_days(days: Option<i64>) -> Self {
        match days {
            None => Self::Unknown,
            Some(d) if d <= 0 => Self::Expired,
            Some(d) if d <= EXPIRING_SOON_DAYS => Self::ExpiringSoon,
            Some(_) => Self::Active,
        }
    }
}

impl Bobina {
    pub fn is_replaced(&self) -> bool {
        self.fecha_reemplazo.is_some()
    }

    pub fn retention_status(&self) -> RetentionStatus {
        RetentionStatus::from_days(self.dias_restantes)
    }
}

/// 登记表单的文本字段（照片单独作为 multipart 文件部分发送）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBobina {
    pub hu: String,
    pub cliente: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// bobina 列表的筛选条件
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BobinaFilter {
    pub search: String,
    pub cliente: String,
    pub fecha_inicio: Option<chrono::NaiveDate>,
    pub fecha_fin: Option<chrono::NaiveDate>,
    pub orden_dias: Option<SortOrder>,
    pub page: u32,
}

impl BobinaFilter {
    /// 转换为查询参数，空字段不发送
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if !self.search.trim().is_empty() {
            pairs.push(("search", self.search.trim().to_string()));
        }
        if !self.cliente.trim().is_empty() {
            pairs.push(("cliente", self.cliente.trim().to_string()));
        }
        if let Some(d) = self.fecha_inicio {
            pairs.push(("fecha_inicio", date::query_fecha(d)));
        }
        if let Some(d) = self.fecha_fin {
            pairs.push(("fecha_fin", date::query_fecha(d)));
        }
        if let Some(order) = self.orden_dias {
            pairs.push(("orden_dias", order.as_str().to_string()));
        }
        pairs.push(("page", self.page.max(1).to_string()));
        pairs
    }

    /// 修改任一筛选条件都回到第一页
    pub fn with_change(&self, change: impl FnOnce(&mut Self)) -> Self {
        let mut next = self.clone();
        change(&mut next);
        next.page = 1;
        next
    }
}

// =========================================================
// 保留规则与库存 (Retention & Inventory)
// =========================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    pub id: u64,
    pub cliente: String,
    pub dias_retencion: u32,
    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<String>,
}

/// 某客户生效的保留天数
pub fn retention_days_for(configs: &[RetentionConfig], cliente: &str) -> u32 {
    configs
        .iter()
        .find(|c| c.cliente.eq_ignore_ascii_case(cliente.trim()))
        .map(|c| c.dias_retencion)
        .unwrap_or(DEFAULT_RETENTION_DAYS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigPayload {
    pub cliente: String,
    pub dias_retencion: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: u64,
    pub hu: String,
    #[serde(default)]
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryPayload {
    pub hu: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descripcion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    pub username: String,
    pub role: Role,
    /// 编辑时留空表示不修改密码
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

// =========================================================
// 分页与错误响应 (Pagination & Error bodies)
// =========================================================

/// Laravel 风格的分页响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            current_page: 1,
            last_page: 1,
            per_page: 0,
            total: 0,
        }
    }
}

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.to_string(), vec![message.into()]);
        Self(map)
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 所有错误信息拼接为一行，用于无法定位到字段的提示
    pub fn summary(&self) -> String {
        self.0
            .values()
            .flat_map(|msgs| msgs.iter())
            .cloned()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 422 响应体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: FieldErrors,
}

/// 409 响应体，可能附带已存在的记录
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConflictBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "existing")]
    pub bobina: Option<Bobina>,
}

/// 其他错误响应的通用形式
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn login_response_accepts_both_id_spellings() {
        let camel: LoginResponse =
            serde_json::from_str(r#"{"token":"t","role":"lider","userId":7}"#).unwrap();
        let snake: LoginResponse =
            serde_json::from_str(r#"{"token":"t","role":"lider","user_id":7}"#).unwrap();
        assert_eq!(camel, snake);
        assert_eq!(camel.role, Role::Lider);
    }

    #[test]
    fn bobina_decodes_replacement_metadata() {
        let json = r#"{
            "id": 3, "hu": "123456789", "cliente": "Acme",
            "foto_url": "/storage/fotos/3.jpg", "fecha_embarque": "2024-03-01",
            "dias_restantes": 5, "fecha_reemplazo": "2024-03-02",
            "reemplazador": "ana", "aprobador": "luis"
        }"#;
        let bobina: Bobina = serde_json::from_str(json).unwrap();
        assert!(bobina.is_replaced());
        assert_eq!(bobina.retention_status(), RetentionStatus::ExpiringSoon);

        let camel: Bobina = serde_json::from_str(
            r#"{"id":4,"hu":"987654321","cliente":"B","fotoUrl":"/x.jpg","diasRestantes":-1}"#,
        )
        .unwrap();
        assert_eq!(camel.foto_url.as_deref(), Some("/x.jpg"));
        assert_eq!(camel.retention_status(), RetentionStatus::Expired);
        assert!(!camel.is_replaced());
    }

    #[test]
    fn filter_omits_empty_fields_and_resets_page() {
        let filter = BobinaFilter {
            search: "  ".into(),
            cliente: "Acme".into(),
            fecha_inicio: NaiveDate::from_ymd_opt(2024, 1, 5),
            orden_dias: Some(SortOrder::Desc),
            page: 4,
            ..Default::default()
        };
        assert_eq!(
            filter.query_pairs(),
            vec![
                ("cliente", "Acme".to_string()),
                ("fecha_inicio", "2024-01-05".to_string()),
                ("orden_dias", "desc".to_string()),
                ("page", "4".to_string()),
            ]
        );

        let next = filter.with_change(|f| f.search = "1234".into());
        assert_eq!(next.page, 1);
        assert_eq!(next.search, "1234");
    }

    #[test]
    fn retention_falls_back_to_default() {
        let configs = vec![RetentionConfig {
            id: 1,
            cliente: "Acme".into(),
            dias_retencion: 30,
            updated_at: None,
        }];
        assert_eq!(retention_days_for(&configs, "acme"), 30);
        assert_eq!(retention_days_for(&configs, "Otro"), DEFAULT_RETENTION_DAYS);
    }

    #[test]
    fn lead_credentials_never_print_password() {
        let creds = LeadCredentials {
            username: "luis".into(),
            password: "secreto".into(),
        };
        let printed = format!("{creds:?}");
        assert!(printed.contains("luis"));
        assert!(!printed.contains("secreto"));
    }

    #[test]
    fn validation_body_exposes_field_errors() {
        let body: ValidationBody = serde_json::from_str(
            r#"{"message":"invalid","errors":{"hu":["El HU ya existe"],"foto":["requerida"]}}"#,
        )
        .unwrap();
        assert_eq!(body.errors.first("hu"), Some("El HU ya existe"));
        assert!(body.errors.contains("foto"));
        assert_eq!(body.errors.summary(), "requerida El HU ya existe");
    }

    #[test]
    fn page_navigation_flags() {
        let page: Page<u8> =
            serde_json::from_str(r#"{"data":[1,2],"current_page":2,"last_page":3}"#).unwrap();
        assert!(page.has_previous());
        assert!(page.has_next());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(Role::parse("LIDER"), Some(Role::Lider));
        assert_eq!(Role::parse("root"), None);
    }
}
