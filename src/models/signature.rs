use serde::{Deserialize, Serialize};

/// 签名图片
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// 载荷大小（字节）
    pub size_bytes: u64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// 原始图片字节，仅供透明度检查使用
    #[serde(skip)]
    pub data: Option<Vec<u8>>,
}

fn default_active() -> bool {
    true
}

impl Signature {
    pub fn new(id: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            mime_type: mime_type.into(),
            size_bytes,
            is_active: true,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.size_bytes = data.len() as u64;
        self.data = Some(data);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// 归一化后的 mime 类型（小写，去掉参数）
    pub fn normalized_mime(&self) -> String {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    pub fn is_png(&self) -> bool {
        self.normalized_mime() == "image/png"
    }
}
