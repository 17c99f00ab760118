//! 文档与接收人数据结构

use serde::{Deserialize, Serialize};

use crate::models::position::SignaturePosition;
use crate::models::signature::Signature;

/// 证书接收人（只读输入）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Recipient {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
        }
    }

    /// 用于进度显示的标签，姓名为空时退回到 id
    pub fn label(&self) -> String {
        if self.name.trim().is_empty() {
            self.id.clone()
        } else {
            self.name.clone()
        }
    }
}

/// 页面尺寸（单位：pt）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl Default for PageSize {
    /// A4
    fn default() -> Self {
        Self {
            width: 595.0,
            height: 842.0,
        }
    }
}

/// 待签名的证书文档
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default = "default_page_count")]
    pub page_count: u32,
    #[serde(default)]
    pub page_size: PageSize,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

fn default_page_count() -> u32 {
    1
}

impl Document {
    pub fn new(id: impl Into<String>, name: impl Into<String>, recipients: Vec<Recipient>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            page_count: 1,
            page_size: PageSize::default(),
            recipients,
        }
    }

    pub fn with_page_count(mut self, page_count: u32) -> Self {
        self.page_count = page_count;
        self
    }

    pub fn is_multi_page(&self) -> bool {
        self.page_count > 1
    }
}

/// 一次签名请求的不可变快照
///
/// 接收人列表在请求被接受时复制一份，之后调用方对 `Document` 的修改不会影响正在运行的任务。
#[derive(Debug, Clone, Serialize)]
pub struct SigningRequest {
    pub document_id: String,
    pub document_name: String,
    pub signature_id: String,
    pub position: SignaturePosition,
    pub recipients: Vec<Recipient>,
}

impl SigningRequest {
    pub fn new(document: &Document, signature: &Signature, position: SignaturePosition) -> Self {
        Self {
            document_id: document.id.clone(),
            document_name: document.name.clone(),
            signature_id: signature.id.clone(),
            position,
            recipients: document.recipients.clone(),
        }
    }

    pub fn total(&self) -> usize {
        self.recipients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recipient_label_falls_back_to_id() {
        assert_eq!(Recipient::new("r-1", "张三").label(), "张三");
        assert_eq!(Recipient::new("r-2", "  ").label(), "r-2");
    }

    #[test]
    fn test_document_defaults_from_toml() {
        let doc: Document = toml::from_str(
            r#"
            id = "doc-1"
            name = "结业证书"

            [[recipients]]
            id = "r-1"
            name = "李四"
            email = "lisi@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(doc.page_count, 1);
        assert_eq!(doc.page_size, PageSize::default());
        assert!(!doc.is_multi_page());
        assert_eq!(doc.recipients.len(), 1);
        assert_eq!(doc.recipients[0].email.as_deref(), Some("lisi@example.com"));
    }
}
