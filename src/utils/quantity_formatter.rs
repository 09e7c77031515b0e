//! 统一的数量格式化工具
//!
//! 小数值带千分位与固定六位小数；超过万亿级改用英文数量级词显
//! 示，保证巨大的余额仍然可读。
//!
//! # 示例
//! ```
//! use capminer_rs::utils::format_quantity;
//! use rust_decimal::Decimal;
//!
//! assert_eq!(format_quantity(Decimal::from(1234u32)), "1,234.000000");
//! assert_eq!(
//!     format_quantity(Decimal::from(1_500_000_000_000u64)),
//!     "1.500 Trillion"
//! );
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 数量级阶梯；Decimal 上限约 7.9e28，Octillion 之后不可达
const MAGNITUDES: [(i128, &str); 6] = [
    (1_000_000_000_000, "Trillion"),
    (1_000_000_000_000_000, "Quadrillion"),
    (1_000_000_000_000_000_000, "Quintillion"),
    (1_000_000_000_000_000_000_000, "Sextillion"),
    (1_000_000_000_000_000_000_000_000, "Septillion"),
    (1_000_000_000_000_000_000_000_000_000, "Octillion"),
];

/// 格式化资源数量
pub fn format_quantity(quantity: Decimal) -> String {
    let approx = quantity.to_f64().unwrap_or(f64::MAX);

    if approx.abs() < 1e12 {
        return group_thousands(&format!("{:.6}", quantity.round_dp(6)));
    }

    let mut scale = MAGNITUDES[0].0;
    let mut unit = MAGNITUDES[0].1;
    for (candidate_scale, candidate_unit) in MAGNITUDES {
        if approx.abs() >= candidate_scale as f64 {
            scale = candidate_scale;
            unit = candidate_unit;
        } else {
            break;
        }
    }

    let scaled = quantity
        .checked_div(Decimal::from_i128_with_scale(scale, 0))
        .unwrap_or(Decimal::ZERO);
    format!("{} {}", group_thousands(&format!("{:.3}", scaled)), unit)
}

/// 给整数部分插入千分位逗号
fn group_thousands(formatted: &str) -> String {
    let (sign, rest) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (int_part, frac_part) = match rest.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rest, None),
    };

    let mut grouped = String::new();
    let digits: Vec<char> = int_part.chars().collect();
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}
