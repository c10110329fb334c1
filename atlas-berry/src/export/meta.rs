use std::fs;
use std::path::Path;

use log::info;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;

use super::write_atomic;
use crate::atlas::AtlasMeta;
use crate::error::{ExportError, WithPath};

/// 将元信息字典以 UTF-8, 4 空格缩进的 JSON 写到 `path`. 非 ASCII 字符原样保留.
pub fn write_meta<P: AsRef<Path>>(meta: &AtlasMeta, path: P) -> Result<(), ExportError> {
    let path = path.as_ref();
    let mut buf = Vec::with_capacity(1024);
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    meta.raw()
        .serialize(&mut ser)
        .map_err(|source| ExportError::Json {
            path: path.to_owned(),
            source,
        })?;
    write_atomic(path, &buf)?;
    info!("wrote {}", path.display());
    Ok(())
}

/// 按字节原样拷贝结构层级文件.
pub fn copy_structures<P: AsRef<Path>, Q: AsRef<Path>>(from: P, to: Q) -> Result<(), ExportError> {
    let (from, to) = (from.as_ref(), to.as_ref());
    if !from.is_file() {
        return Err(ExportError::MissingPath(from.to_owned()));
    }
    fs::copy(from, to).with_path(to)?;
    info!("copied {} -> {}", from.display(), to.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{copy_structures, write_meta};
    use crate::atlas::AtlasMeta;
    use serde_json::{json, Value};
    use std::fs;

    #[test]
    fn test_meta_round_trip_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        let meta = AtlasMeta::from_value(json!({
            "name": "tiny",
            "shape": [1, 2, 3],
            "resolution": [1, 1, 1],
            "species": "Mus musculus (ü)",
        }))
        .unwrap();
        write_meta(&meta, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("(ü)"));
        assert!(text.contains("\n    \"name\""));
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(&back, &Value::Object(meta.raw().clone()));
    }

    #[test]
    fn test_structures_copied_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("src.json");
        let to = dir.path().join("structures.json");
        // 非规范化 JSON, 验证没有被重新序列化.
        let raw = b"[ {\"acronym\":\"root\" ,\"id\":997} ]\r\n";
        fs::write(&from, raw).unwrap();
        copy_structures(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), raw);

        assert!(copy_structures(dir.path().join("missing.json"), &to).is_err());
    }
}
