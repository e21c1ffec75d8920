// ==========================================
// 健康追踪系统 - 文本解码
// ==========================================
// 职责: 字节 → 文本
// 顺序: UTF-8(去 BOM) → Windows-1252(Latin-1 超集)
// ==========================================

use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use tracing::debug;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// 解码上传的 CSV 字节
///
/// Windows-1252 对任意字节序列都能解码,因此本函数不会失败。
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    match std::str::from_utf8(body) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, _, _) = WINDOWS_1252.decode(body);
            debug!(len = body.len(), "非 UTF-8 输入,按 Windows-1252 解码");
            Cow::Owned(text.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_with_bom() {
        let bytes = b"\xEF\xBB\xBFfecha,peso\n2026-03-01,74\n";
        assert_eq!(decode_text(bytes), "fecha,peso\n2026-03-01,74\n");
    }

    #[test]
    fn test_plain_utf8() {
        let text = "sueño,cintura\n";
        assert_eq!(decode_text(text.as_bytes()), text);
    }

    #[test]
    fn test_latin1_fallback() {
        // "sueño" 的 Latin-1 编码
        let bytes = b"sue\xF1o\n";
        assert_eq!(decode_text(bytes), "sueño\n");
    }
}
