//! 签名位置与受保护区域

use serde::{Deserialize, Serialize};

use crate::models::document::PageSize;

/// 签名位置
///
/// - `x` / `y`：相对页面左上角的百分比（0-100）
/// - `width` / `height`：签名尺寸（pt）
/// - `page`：可选页码（从 0 开始），为空表示最后一页
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignaturePosition {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl SignaturePosition {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            page: None,
        }
    }

    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// 换算成页面百分比坐标的矩形
    pub fn to_page_rect(&self, page_size: &PageSize) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            width: percent_of(self.width, page_size.width),
            height: percent_of(self.height, page_size.height),
        }
    }
}

fn percent_of(value: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        value / total * 100.0
    }
}

/// 百分比坐标下的矩形
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// 两个矩形是否有面积重叠（仅边相接不算）
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// 页面上不建议放置签名的区域（页眉、正文、页脚）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectedRegion {
    pub name: String,
    #[serde(flatten)]
    pub rect: Rect,
}

impl ProtectedRegion {
    pub fn new(name: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            rect: Rect {
                x,
                y,
                width,
                height,
            },
        }
    }

    /// 默认区域：页眉、正文、页脚
    pub fn default_regions() -> Vec<Self> {
        vec![
            Self::new("header", 0.0, 0.0, 100.0, 12.0),
            Self::new("content", 10.0, 15.0, 80.0, 50.0),
            Self::new("footer", 0.0, 92.0, 100.0, 8.0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_page_rect_uses_page_size() {
        let pos = SignaturePosition::new(10.0, 20.0, 119.0, 84.2);
        let rect = pos.to_page_rect(&PageSize::default());

        assert_eq!(rect.x, 10.0);
        assert_eq!(rect.y, 20.0);
        assert!((rect.width - 20.0).abs() < 1e-9);
        assert!((rect.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rect_overlap() {
        let a = Rect { x: 0.0, y: 0.0, width: 10.0, height: 10.0 };
        let b = Rect { x: 5.0, y: 5.0, width: 10.0, height: 10.0 };
        let touching = Rect { x: 10.0, y: 0.0, width: 5.0, height: 5.0 };

        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&touching));
    }

    #[test]
    fn test_protected_region_from_toml() {
        #[derive(Deserialize)]
        struct Regions {
            regions: Vec<ProtectedRegion>,
        }

        let parsed: Regions = toml::from_str(
            r#"
            [[regions]]
            name = "stamp"
            x = 70.0
            y = 70.0
            width = 20.0
            height = 20.0
            "#,
        )
        .unwrap();

        assert_eq!(parsed.regions[0], ProtectedRegion::new("stamp", 70.0, 70.0, 20.0, 20.0));
    }
}
