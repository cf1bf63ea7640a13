//! 表单草稿与客户端校验
//!
//! 组件只保存草稿（输入框的原始字符串），提交前调用 `validate` 得到
//! 请求载荷或按字段分组的错误。

use bobinas_shared::validation::{parse_retention_days, require, validate_hu};
use bobinas_shared::{
    AcceptanceRule, ConfigPayload, FieldErrors, InventoryItem, InventoryPayload, NewBobina,
    RetentionConfig, Role, Timestamp, User, UserPayload,
};

/// 照片是必填项时的提示
pub const PHOTO_REQUIRED: &str = "Debe adjuntar o tomar una foto";

/// bobina 登记表单
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationDraft {
    pub hu: String,
    pub cliente: String,
}

impl RegistrationDraft {
    pub fn with_cliente(cliente: Option<String>) -> Self {
        Self {
            hu: String::new(),
            cliente: cliente.unwrap_or_default(),
        }
    }

    /// HU 不是恰好 9 位数字时不允许提交
    pub fn validate(&self, has_photo: bool) -> Result<NewBobina, FieldErrors> {
        let mut errors = FieldErrors::default();
        let hu = validate_hu(&self.hu).map_err(|e| errors.push("hu", e.to_string()));
        let cliente = require("cliente", &self.cliente).map_err(|e| errors.push("cliente", e.to_string()));
        if !has_photo {
            errors.push("foto", PHOTO_REQUIRED);
        }
        match (hu, cliente) {
            (Ok(hu), Ok(cliente)) if errors.is_empty() => Ok(NewBobina { hu, cliente }),
            _ => Err(errors),
        }
    }

    /// 提交按钮是否可用（只看 HU 格式与必填项，不产生错误信息）
    pub fn is_submittable(&self, has_photo: bool) -> bool {
        has_photo && AcceptanceRule::BOBINA_HU.accepts(&self.hu) && !self.cliente.trim().is_empty()
    }
}

/// 拍照或选图后生成的文件名
pub fn photo_filename(hu: &str, now: Timestamp) -> String {
    match validate_hu(hu) {
        Ok(hu) => format!("foto_{}.jpg", hu),
        Err(_) => format!("foto_{}.jpg", now.as_millis()),
    }
}

/// 用户表单；编辑时密码可留空
#[derive(Debug, Clone, PartialEq)]
pub struct UserDraft {
    pub username: String,
    pub role: Role,
    pub password: String,
}

impl Default for UserDraft {
    fn default() -> Self {
        Self {
            username: String::new(),
            role: Role::Embarcador,
            password: String::new(),
        }
    }
}

impl From<&User> for UserDraft {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role,
            password: String::new(),
        }
    }
}

impl UserDraft {
    pub fn validate(&self, editing: bool) -> Result<UserPayload, FieldErrors> {
        let mut errors = FieldErrors::default();
        let username = require("usuario", &self.username).map_err(|e| errors.push("username", e.to_string()));
        let password = if self.password.is_empty() {
            if !editing {
                errors.push("password", "La contraseña es obligatoria");
            }
            None
        } else if self.password.len() < 6 {
            errors.push("password", "La contraseña debe tener al menos 6 caracteres");
            None
        } else {
            Some(self.password.clone())
        };
        match username {
            Ok(username) if errors.is_empty() => Ok(UserPayload {
                username,
                role: self.role,
                password,
            }),
            _ => Err(errors),
        }
    }
}

/// 保留规则表单
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDraft {
    pub cliente: String,
    pub dias_retencion: String,
}

impl From<&RetentionConfig> for ConfigDraft {
    fn from(config: &RetentionConfig) -> Self {
        Self {
            cliente: config.cliente.clone(),
            dias_retencion: config.dias_retencion.to_string(),
        }
    }
}

impl ConfigDraft {
    pub fn validate(&self) -> Result<ConfigPayload, FieldErrors> {
        let mut errors = FieldErrors::default();
        let cliente = require("cliente", &self.cliente).map_err(|e| errors.push("cliente", e.to_string()));
        let dias = parse_retention_days(&self.dias_retencion)
            .map_err(|e| errors.push("dias_retencion", e.to_string()));
        match (cliente, dias) {
            (Ok(cliente), Ok(dias_retencion)) => Ok(ConfigPayload {
                cliente,
                dias_retencion,
            }),
            _ => Err(errors),
        }
    }
}

/// 库存目录表单；序列号不限制格式
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryDraft {
    pub hu: String,
    pub descripcion: String,
}

impl From<&InventoryItem> for InventoryDraft {
    fn from(item: &InventoryItem) -> Self {
        Self {
            hu: item.hu.clone(),
            descripcion: item.descripcion.clone().unwrap_or_default(),
        }
    }
}

impl InventoryDraft {
    pub fn validate(&self) -> Result<InventoryPayload, FieldErrors> {
        match AcceptanceRule::INVENTORY_SERIAL.check(&self.hu) {
            Ok(hu) => {
                let descripcion = self.descripcion.trim();
                Ok(InventoryPayload {
                    hu,
                    descripcion: (!descripcion.is_empty()).then(|| descripcion.to_string()),
                })
            }
            Err(_) => Err(FieldErrors::single("hu", "El código es obligatorio")),
        }
    }
}
