//! 签名位置优化 - 业务能力层
//!
//! 把已通过校验的位置收拢到页面上比较安全的范围内。

use crate::models::{Document, SignaturePosition};

pub const OPTIMIZED_X_RANGE: (f64, f64) = (5.0, 85.0);
pub const OPTIMIZED_Y_RANGE: (f64, f64) = (5.0, 90.0);

/// 低于这个 y 值的签名容易压到页眉/正文
const HEADER_ZONE_LIMIT: f64 = 30.0;
/// 被挪走的签名统一放到这里
const RELOCATED_Y: f64 = 75.0;

const MULTI_PAGE_ASPECT_RATIO: f64 = 0.4;
const SINGLE_PAGE_ASPECT_RATIO: f64 = 0.5;

/// 优化签名位置
///
/// - `x` 限制在 [5, 85]，`y` 限制在 [5, 90]
/// - `height` 不超过 `width × 宽高比`（多页 0.4，单页 0.5）
/// - `y < 30` 时移到 `y = 75`
///
/// 幂等：对结果再调用一次得到相同的值。
pub fn optimize_position(position: &SignaturePosition, document: &Document) -> SignaturePosition {
    let aspect_ratio = if document.is_multi_page() {
        MULTI_PAGE_ASPECT_RATIO
    } else {
        SINGLE_PAGE_ASPECT_RATIO
    };

    let x = clamp(position.x, OPTIMIZED_X_RANGE);
    let mut y = clamp(position.y, OPTIMIZED_Y_RANGE);
    if y < HEADER_ZONE_LIMIT {
        y = RELOCATED_Y;
    }

    SignaturePosition {
        x,
        y,
        width: position.width,
        height: position.height.min(position.width * aspect_ratio),
        page: position.page,
    }
}

fn clamp(value: f64, (min, max): (f64, f64)) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}
