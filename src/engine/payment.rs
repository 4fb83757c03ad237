// ==========================================
// 停车场系统 - 付款策略
// ==========================================
// 职责: 付款方式注册表,按方式标识（大小写不敏感）分派
// 说明: 现金/刷卡均为纯计算,按实收金额生成结算记录
// 扩展: 新方式实现 PaymentMethod 后 register,无需修改分派逻辑
// ==========================================

use crate::domain::billing::{Bill, Payment};
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

// ==========================================
// Trait: PaymentMethod
// ==========================================
pub trait PaymentMethod: Send + Sync {
    /// 方式标识（注册时转为大写）
    fn name(&self) -> &str;

    /// 生成结算记录
    fn pay(&self, bill: &Bill, amount: f64, at: NaiveDateTime) -> Payment;
}

/// 现金
#[derive(Debug, Clone, Default)]
pub struct CashPayment;

impl PaymentMethod for CashPayment {
    fn name(&self) -> &str {
        "CASH"
    }

    fn pay(&self, _bill: &Bill, amount: f64, at: NaiveDateTime) -> Payment {
        Payment {
            amount,
            method: self.name().to_string(),
            paid_at: at,
        }
    }
}

/// 刷卡
#[derive(Debug, Clone, Default)]
pub struct CardPayment;

impl PaymentMethod for CardPayment {
    fn name(&self) -> &str {
        "CARD"
    }

    fn pay(&self, _bill: &Bill, amount: f64, at: NaiveDateTime) -> Payment {
        Payment {
            amount,
            method: self.name().to_string(),
            paid_at: at,
        }
    }
}

// ==========================================
// PaymentRegistry - 付款方式注册表
// ==========================================
pub struct PaymentRegistry {
    methods: HashMap<String, Arc<dyn PaymentMethod>>,
}

impl PaymentRegistry {
    /// 空注册表
    pub fn empty() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// 注册新方式（同名覆盖）
    pub fn register(&mut self, method: Arc<dyn PaymentMethod>) {
        self.methods.insert(method.name().to_uppercase(), method);
    }

    pub fn supports(&self, method_id: &str) -> bool {
        self.methods.contains_key(&method_id.trim().to_uppercase())
    }

    /// 已注册方式（排序）
    pub fn method_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.methods.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 收款
    ///
    /// # 错误
    /// - UnknownPaymentMethod: 方式未注册
    pub fn take_payment(
        &self,
        bill: &Bill,
        method_id: &str,
        amount: f64,
        at: NaiveDateTime,
    ) -> EngineResult<Payment> {
        let method = self
            .methods
            .get(&method_id.trim().to_uppercase())
            .ok_or_else(|| EngineError::UnknownPaymentMethod {
                method: method_id.to_string(),
            })?;

        let payment = method.pay(bill, amount, at);
        info!(
            plate = %bill.plate(),
            method = %payment.method,
            amount = payment.amount,
            total_due = bill.total_due(),
            "收款完成"
        );
        Ok(payment)
    }
}

impl Default for PaymentRegistry {
    /// 默认注册 CASH / CARD
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(CashPayment));
        registry.register(Arc::new(CardPayment));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    struct VoucherPayment;

    impl PaymentMethod for VoucherPayment {
        fn name(&self) -> &str {
            "voucher"
        }

        fn pay(&self, bill: &Bill, _amount: f64, at: NaiveDateTime) -> Payment {
            // 代金券全额抵扣
            Payment {
                amount: bill.total_due(),
                method: "VOUCHER".to_string(),
                paid_at: at,
            }
        }
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let registry = PaymentRegistry::default();
        let bill = Bill::new("P", "F1-R1-S1", 2, 5.0, 10.0, 0.0);
        let payment = registry.take_payment(&bill, "cash", 6.0, now()).unwrap();
        assert_eq!(payment.method, "CASH");
        assert_eq!(payment.amount, 6.0);
        assert_eq!(payment.balance_against(&bill), -4.0);
        assert_eq!(registry.take_payment(&bill, "Card", 10.0, now()).unwrap().method, "CARD");
    }

    #[test]
    fn test_unknown_method() {
        let registry = PaymentRegistry::default();
        let bill = Bill::new("P", "F1-R1-S1", 1, 5.0, 5.0, 0.0);
        assert!(matches!(
            registry.take_payment(&bill, "BITCOIN", 5.0, now()),
            Err(EngineError::UnknownPaymentMethod { .. })
        ));
    }

    #[test]
    fn test_register_extension() {
        let mut registry = PaymentRegistry::default();
        registry.register(Arc::new(VoucherPayment));
        assert!(registry.supports("VOUCHER"));
        assert_eq!(registry.method_ids(), vec!["CARD", "CASH", "VOUCHER"]);
        let bill = Bill::new("P", "F1-R1-S1", 1, 5.0, 5.0, 0.0);
        let payment = registry.take_payment(&bill, "voucher", 0.0, now()).unwrap();
        assert_eq!(payment.amount, 5.0);
    }
}
