// ==========================================
// 停车场系统 - 输入校验
// ==========================================
// 职责: 车牌与付款金额的边界校验,失败一律 InvalidInput
// ==========================================

use crate::api::error::{ApiError, ApiResult};

/// 车牌规范化: 去首尾空白、转大写
///
/// # 错误
/// - InvalidInput: 车牌为空
pub fn validate_plate(plate: &str) -> ApiResult<String> {
    let normalized = plate.trim().to_uppercase();
    if normalized.is_empty() {
        return Err(ApiError::InvalidInput("车牌不能为空".to_string()));
    }
    Ok(normalized)
}

/// 付款金额必须为有限正数
pub fn validate_payment_amount(amount: f64) -> ApiResult<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::InvalidInput(format!(
            "付款金额必须为正数: {}",
            amount
        )));
    }
    Ok(amount)
}

/// 付款方式标识不能为空
pub fn validate_method(method_id: &str) -> ApiResult<String> {
    let method = method_id.trim();
    if method.is_empty() {
        return Err(ApiError::InvalidInput("付款方式不能为空".to_string()));
    }
    Ok(method.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::error::ErrorKind;

    #[test]
    fn test_plate() {
        assert_eq!(validate_plate("  wxy 123 ").unwrap(), "WXY 123");
        assert_eq!(
            validate_plate("   ").unwrap_err().kind(),
            ErrorKind::ValidationFailure
        );
    }

    #[test]
    fn test_payment_amount() {
        assert_eq!(validate_payment_amount(10.5).unwrap(), 10.5);
        assert!(validate_payment_amount(0.0).is_err());
        assert!(validate_payment_amount(-3.0).is_err());
        assert!(validate_payment_amount(f64::NAN).is_err());
    }

    #[test]
    fn test_method() {
        assert_eq!(validate_method(" cash ").unwrap(), "cash");
        assert!(validate_method("").is_err());
    }
}
