//! 签名请求校验 - 业务能力层
//!
//! 纯函数，只负责"这个请求能不能签"，不发起任何签名调用。
//! 错误会阻止任务启动，警告只做提示。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Document, ProtectedRegion, Signature, SignaturePosition};

/// 允许上传的签名图片类型
pub const ALLOWED_SIGNATURE_MIME_TYPES: [&str; 4] =
    ["image/png", "image/jpeg", "image/jpg", "image/svg+xml"];

pub const X_RANGE: (f64, f64) = (0.0, 100.0);
pub const Y_RANGE: (f64, f64) = (0.0, 100.0);
pub const WIDTH_RANGE: (f64, f64) = (50.0, 500.0);
pub const HEIGHT_RANGE: (f64, f64) = (20.0, 250.0);

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl ValidationResult {
    pub fn push_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn push_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// 合并另一个结果，保持各自的顺序
    pub fn merge(&mut self, other: ValidationResult) {
        self.is_valid &= other.is_valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// 校验阈值
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationRules {
    /// 签名载荷大小上限（字节）
    pub max_signature_bytes: u64,
    /// 接收人数量告警阈值（软限制）
    pub large_recipient_threshold: usize,
    pub protected_regions: Vec<ProtectedRegion>,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            max_signature_bytes: 5 * 1024 * 1024,
            large_recipient_threshold: 1000,
            protected_regions: ProtectedRegion::default_regions(),
        }
    }
}

/// 校验签名表单
///
/// # 参数
/// - `document`: 待签名文档（含接收人列表）
/// - `signature`: 选中的签名，可能为空
/// - `position`: 签名位置（优化前的原始值）
/// - `rules`: 校验阈值
///
/// # 返回
/// 返回校验结果，`errors` 非空时 `is_valid` 为 false
pub fn validate_signing_form(
    document: &Document,
    signature: Option<&Signature>,
    position: &SignaturePosition,
    rules: &ValidationRules,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    match signature {
        None => result.push_error("signature required"),
        Some(signature) => {
            if !signature.is_active {
                result.push_warning(format!("signature '{}' is not active", signature.name));
            }
            if signature.size_bytes > rules.max_signature_bytes {
                result.push_warning(format!(
                    "signature payload is {} bytes, larger than {} bytes",
                    signature.size_bytes, rules.max_signature_bytes
                ));
            }
        }
    }

    check_range(&mut result, "x", position.x, X_RANGE);
    check_range(&mut result, "y", position.y, Y_RANGE);
    check_range(&mut result, "width", position.width, WIDTH_RANGE);
    check_range(&mut result, "height", position.height, HEIGHT_RANGE);

    let rect = position.to_page_rect(&document.page_size);
    for region in &rules.protected_regions {
        if rect.overlaps(&region.rect) {
            result.push_warning(format!(
                "signature overlaps protected region '{}'",
                region.name
            ));
        }
    }

    let recipient_count = document.recipients.len();
    if recipient_count == 0 {
        result.push_error("recipient list is empty");
    } else if recipient_count > rules.large_recipient_threshold {
        result.push_warning(format!(
            "{} recipients exceeds {}, signing may take a long time",
            recipient_count, rules.large_recipient_threshold
        ));
    }

    debug!(
        "表单校验完成: 文档 {} | 错误 {} | 警告 {}",
        document.id,
        result.errors.len(),
        result.warnings.len()
    );

    result
}

/// 校验签名图片文件
///
/// 检查大小上限和类型白名单。对 PNG 额外做一次透明度检查：
/// 只读 IHDR 的颜色类型和是否存在 `tRNS` 块，不解码图片，结果仅供参考。
pub fn validate_signature_file(signature: &Signature, rules: &ValidationRules) -> ValidationResult {
    let mut result = ValidationResult::default();

    if signature.size_bytes == 0 {
        result.push_error("signature file is empty");
    } else if signature.size_bytes > rules.max_signature_bytes {
        result.push_error(format!(
            "signature file is {} bytes, maximum is {} bytes",
            signature.size_bytes, rules.max_signature_bytes
        ));
    }

    let mime = signature.normalized_mime();
    if !ALLOWED_SIGNATURE_MIME_TYPES.contains(&mime.as_str()) {
        result.push_error(format!(
            "unsupported signature type '{}', allowed: {}",
            signature.mime_type,
            ALLOWED_SIGNATURE_MIME_TYPES.join(", ")
        ));
    } else if signature.is_png() && !png_has_transparency(signature.data.as_deref()) {
        result.push_warning("PNG signature may not have a transparent background");
    }

    result
}

/// PNG 是否带透明通道；没有字节或无法判断时视为没有
fn png_has_transparency(data: Option<&[u8]>) -> bool {
    let Some(data) = data else {
        return false;
    };
    // 8 字节签名 + 4 长度 + "IHDR" + 13 字节数据
    if data.len() < 33 || data[..8] != PNG_MAGIC || &data[12..16] != b"IHDR" {
        return false;
    }

    // 4: 灰度 + alpha, 6: RGBA
    let color_type = data[25];
    if color_type == 4 || color_type == 6 {
        return true;
    }

    data.windows(4).any(|w| w == b"tRNS")
}

fn check_range(result: &mut ValidationResult, field: &str, value: f64, (min, max): (f64, f64)) {
    if !value.is_finite() || value < min || value > max {
        result.push_error(format!(
            "position {} must be between {} and {} (got {})",
            field, min, max, value
        ));
    }
}
