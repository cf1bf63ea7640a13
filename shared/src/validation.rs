//! 输入校验规则
//!
//! 表单提交和扫码结果共用同一套规则：
//! bobina 的 HU 必须恰好 9 位数字，库存序列号只要求非空。

use thiserror::Error;

/// bobina HU 的固定长度
pub const HU_LENGTH: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("El HU debe tener exactamente {expected} dígitos")]
    HuFormat { expected: usize },
    #[error("El código escaneado está vacío")]
    Empty,
    #[error("El campo {0} es obligatorio")]
    Required(&'static str),
    #[error("Los días de retención deben ser un entero positivo")]
    RetentionDays,
}

/// 扫码 / 输入的接受规则
///
/// 两条扫码流程（bobina 登记与库存目录）共用一个扫描控制器，
/// 区别只在这里的规则。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptanceRule {
    /// 恰好 n 位 ASCII 数字
    ExactDigits(usize),
    /// 任意非空文本
    NonEmpty,
}

impl AcceptanceRule {
    pub const BOBINA_HU: Self = Self::ExactDigits(HU_LENGTH);
    pub const INVENTORY_SERIAL: Self = Self::NonEmpty;

    /// 校验并返回接受的值
    ///
    /// 数字规则按原样校验，前后带空白也不通过；序列号去除首尾空白。
    pub fn check(&self, raw: &str) -> Result<String, ValidationError> {
        match *self {
            Self::ExactDigits(n) => {
                if raw.len() == n && raw.bytes().all(|b| b.is_ascii_digit()) {
                    Ok(raw.to_string())
                } else {
                    Err(ValidationError::HuFormat { expected: n })
                }
            }
            Self::NonEmpty => {
                let value = raw.trim();
                if value.is_empty() {
                    Err(ValidationError::Empty)
                } else {
                    Ok(value.to_string())
                }
            }
        }
    }

    pub fn accepts(&self, raw: &str) -> bool {
        self.check(raw).is_ok()
    }
}

/// bobina 登记表单的 HU 校验
pub fn validate_hu(hu: &str) -> Result<String, ValidationError> {
    AcceptanceRule::BOBINA_HU.check(hu)
}

pub fn require(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(value.to_string())
    }
}

/// 解析保留天数输入框
pub fn parse_retention_days(raw: &str) -> Result<u32, ValidationError> {
    match raw.trim().parse::<u32>() {
        Ok(days) if days > 0 => Ok(days),
        _ => Err(ValidationError::RetentionDays),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hu_requires_exactly_nine_digits() {
        assert_eq!(validate_hu("123456789"), Ok("123456789".to_string()));

        for bad in [
            "12345678",
            "1234567890",
            "12345678a",
            "",
            "ABCDEFGHI",
            "1234 5678",
            " 123456789",
            "123456789\n",
        ] {
            assert_eq!(
                validate_hu(bad),
                Err(ValidationError::HuFormat { expected: 9 }),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn hu_rejects_non_ascii_digits() {
        // 全角数字长度恰好 9 个字符，但不是 ASCII
        assert!(!AcceptanceRule::BOBINA_HU.accepts("１２３４５６７８９"));
    }

    #[test]
    fn inventory_rule_accepts_any_non_empty_serial() {
        let rule = AcceptanceRule::INVENTORY_SERIAL;
        assert_eq!(rule.check(" SN-00A1 "), Ok("SN-00A1".to_string()));
        assert_eq!(rule.check("   "), Err(ValidationError::Empty));
    }

    #[test]
    fn retention_days_must_be_positive() {
        assert_eq!(parse_retention_days("30"), Ok(30));
        assert_eq!(parse_retention_days("0"), Err(ValidationError::RetentionDays));
        assert_eq!(parse_retention_days("-5"), Err(ValidationError::RetentionDays));
        assert_eq!(parse_retention_days("diez"), Err(ValidationError::RetentionDays));
    }

    #[test]
    fn require_trims_input() {
        assert_eq!(require("cliente", " Acme "), Ok("Acme".to_string()));
        assert_eq!(require("cliente", ""), Err(ValidationError::Required("cliente")));
    }
}
