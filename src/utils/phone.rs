use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static INDIAN_MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+91[6-9]\d{9}$").expect("valid phone regex"));

/// 验证印度手机号格式 (+91 + 10 位, 首位 6-9)
pub fn validate_in_phone(phone: &str) -> AppResult<()> {
    if !INDIAN_MOBILE.is_match(phone) {
        return Err(AppError::ValidationError(
            "Invalid phone number, expected an Indian mobile number (+91xxxxxxxxxx)".to_string(),
        ));
    }
    Ok(())
}

/// 格式化手机号，确保以 +91 开头
pub fn format_in_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() == 12 && digits.starts_with("91") {
        format!("+{digits}")
    } else if digits.len() == 11 && digits.starts_with('0') {
        format!("+91{}", &digits[1..])
    } else if digits.len() == 10 {
        format!("+91{digits}")
    } else {
        phone.trim().to_string()
    }
}

/// 规范化用户标识，用作余额 / 奖励登记的 user_key
pub fn normalize_user_key(phone: &str) -> AppResult<String> {
    let formatted = format_in_phone(phone);
    validate_in_phone(&formatted)?;
    Ok(formatted)
}
