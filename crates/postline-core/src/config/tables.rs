//! Built-in lookup tables.

use crate::record::Calculator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A calculator page on the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorLink {
    /// Path under the site root, e.g. `/calculators/calc_dsr/`.
    pub path: String,
    /// Button label.
    pub label: String,
}

impl CalculatorLink {
    fn new(path: &str, label: &str) -> Self {
        Self { path: path.to_string(), label: label.to_string() }
    }
}

/// Category label → bucket, as filed on the site.
pub fn default_categories() -> BTreeMap<String, String> {
    [
        ("부동산 분석", "analysis"),
        ("청약 정보", "subscription"),
        ("투자 꿀팁", "tips"),
        ("시장 전망", "outlook"),
        ("세금/정책", "policy"),
    ]
    .into_iter()
    .map(|(label, bucket)| (label.to_string(), bucket.to_string()))
    .collect()
}

/// The nine calculators linked from generated posts.
pub fn default_calculators() -> BTreeMap<Calculator, CalculatorLink> {
    BTreeMap::from([
        (Calculator::Dsr, CalculatorLink::new("/calculators/calc_dsr/", "📉 DSR & 대출 한도 계산기")),
        (Calculator::Interest, CalculatorLink::new("/calculators/calc_interest/", "💰 대출 이자 계산기")),
        (Calculator::Fee, CalculatorLink::new("/calculators/calc_fee/", "🤝 중개보수(복비) 계산기")),
        (Calculator::Tax, CalculatorLink::new("/calculators/calc_tax/", "🏠 취득세 계산기")),
        (Calculator::Transfer, CalculatorLink::new("/calculators/calc_transfer/", "💸 양도소득세 계산기")),
        (Calculator::Hold, CalculatorLink::new("/calculators/calc_hold/", "🏠 보유세(재산세+종부세) 계산기")),
        (Calculator::Sub, CalculatorLink::new("/calculators/calc_subscription/", "🏆 청약 가점 계산기")),
        (Calculator::Rent, CalculatorLink::new("/calculators/calc_rent/", "🔄 전월세 전환율 계산기")),
        (Calculator::Salary, CalculatorLink::new("/calculators/calc_salary/", "💵 연봉 실수령액 계산기")),
    ])
}
