// 文件名校验器
//
// 按扩展名白名单判断文件是否允许上传，纯函数，不做任何 I/O

use crate::uploader::ValidationVerdict;
use std::collections::HashSet;
use tracing::warn;

/// 扩展名白名单校验器
#[derive(Debug, Clone)]
pub struct ExtensionValidator {
    /// 允许的扩展名（已统一为小写，不含点号）
    allowed: HashSet<String>,
}

impl ExtensionValidator {
    /// 创建校验器
    ///
    /// 白名单条目会去掉前导点号并转为小写，空条目被忽略
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = allowed
            .into_iter()
            .map(|ext| ext.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { allowed }
    }

    /// 白名单是否为空（为空时拒绝一切文件）
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    /// 判断文件名是否允许上传
    pub fn validate(&self, filename: &str) -> bool {
        self.check(filename).accepted
    }

    /// 校验文件名并返回详细结果
    ///
    /// - 空文件名或不含 `.` 的文件名直接拒绝
    /// - 只取最后一个 `.` 之后的部分，忽略大小写
    pub fn check(&self, filename: &str) -> ValidationVerdict {
        let extension = match filename.rsplit_once('.') {
            Some((_, ext)) => ext.to_lowercase(),
            _ => {
                warn!("拒绝无效文件名（缺少扩展名）: {:?}", filename);
                return ValidationVerdict {
                    accepted: false,
                    extension: None,
                };
            }
        };

        let accepted = self.allowed.contains(&extension);
        if !accepted {
            warn!(
                "拒绝不允许的文件类型: {:?} (扩展名: {:?})",
                filename, extension
            );
        }

        ValidationVerdict {
            accepted,
            extension: Some(extension),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn default_validator() -> ExtensionValidator {
        ExtensionValidator::new(["txt", "pdf", "png", "jpg", "zip", "docx"])
    }

    #[test]
    fn test_rejects_empty_and_dotless() {
        let validator = default_validator();
        assert!(!validator.validate(""));
        assert!(!validator.validate("README"));
        assert_eq!(validator.check("README").extension, None);
    }

    #[test]
    fn test_accepts_allowed_extension() {
        let validator = default_validator();
        assert!(validator.validate("report.pdf"));
        assert!(validator.validate("photo.PNG"));
        assert!(validator.validate("Report.Pdf"));
    }

    #[test]
    fn test_multiple_dots_use_last_segment() {
        let validator = default_validator();
        assert!(validator.validate("archive.tar.zip"));
        assert!(!validator.validate("report.pdf.exe"));

        let verdict = validator.check("report.pdf.exe");
        assert_eq!(verdict.extension.as_deref(), Some("exe"));
    }

    #[test]
    fn test_trailing_dot_is_rejected() {
        let validator = default_validator();
        let verdict = validator.check("report.");
        assert!(!verdict.accepted);
        assert_eq!(verdict.extension.as_deref(), Some(""));
    }

    #[test]
    fn test_empty_allow_set_rejects_everything() {
        let validator = ExtensionValidator::new(Vec::<String>::new());
        assert!(validator.is_empty());
        assert!(!validator.validate("report.pdf"));
        assert!(!validator.validate("a.txt"));
    }

    #[test]
    fn test_allow_set_is_normalized() {
        let validator = ExtensionValidator::new([".PDF", " Txt ", ""]);
        assert!(validator.validate("a.pdf"));
        assert!(validator.validate("a.TXT"));
        assert!(!validator.is_empty());
    }

    proptest! {
        #[test]
        fn prop_dotless_names_rejected(name in "[A-Za-z0-9_-]{0,40}") {
            let validator = default_validator();
            prop_assert!(!validator.validate(&name));
        }

        #[test]
        fn prop_case_variations_accept_identically(
            stem in "[A-Za-z0-9_.-]{0,30}",
            ext in prop::sample::select(vec!["txt", "pdf", "png", "jpg", "zip", "docx"]),
            mask in any::<u8>(),
        ) {
            let validator = default_validator();
            let varied: String = ext
                .chars()
                .enumerate()
                .map(|(i, c)| if mask & (1 << (i % 8)) != 0 { c.to_ascii_uppercase() } else { c })
                .collect();
            let lower = format!("{}.{}", stem, ext);
            let mixed = format!("{}.{}", stem, varied);
            prop_assert!(validator.validate(&lower));
            prop_assert_eq!(validator.validate(&lower), validator.validate(&mixed));
        }

        #[test]
        fn prop_unknown_extension_rejected(stem in "[A-Za-z0-9_-]{1,20}") {
            let validator = default_validator();
            let filename = format!("{}.exe", stem);
            prop_assert!(!validator.validate(&filename));
        }
    }
}
