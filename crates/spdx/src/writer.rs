//! 스트리밍 JSON 매니페스트 작성기
//!
//! 문서 전체를 메모리에 만들지 않고 객체/배열 경계를 직접 열고 닫으면서
//! 요소를 하나씩 기록합니다. 요소 자체의 인코딩은 `serde_json`이 맡습니다.

use std::io::Write;

use serde::Serialize;

use crate::error::SpdxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

#[derive(Debug)]
struct Frame {
    container: Container,
    empty: bool,
}

/// 스트리밍 JSON 작성기
pub struct ManifestWriter<W: Write> {
    out: W,
    stack: Vec<Frame>,
    path: String,
}

impl<W: Write> ManifestWriter<W> {
    /// `path`는 에러 메시지용 대상 이름입니다.
    pub fn new(out: W, path: impl Into<String>) -> Self {
        Self {
            out,
            stack: Vec::new(),
            path: path.into(),
        }
    }

    fn io(&self, source: std::io::Error) -> SpdxError {
        SpdxError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn raw(&mut self, bytes: &[u8]) -> Result<(), SpdxError> {
        self.out.write_all(bytes).map_err(|e| self.io(e))
    }

    /// 현재 컨테이너에 항목 구분자를 씁니다.
    fn separator(&mut self) -> Result<(), SpdxError> {
        let needs_comma = match self.stack.last_mut() {
            Some(frame) => {
                let needs = !frame.empty;
                frame.empty = false;
                needs
            }
            None => false,
        };
        if needs_comma {
            self.raw(b",")?;
        }
        if !self.stack.is_empty() {
            self.raw(b"\n")?;
        }
        Ok(())
    }

    fn expect_top(&self, container: Container) -> Result<(), SpdxError> {
        match self.stack.last() {
            Some(frame) if frame.container == container => Ok(()),
            _ => Err(SpdxError::Serialization(format!(
                "writer is not inside a json {container:?}"
            ))),
        }
    }

    fn key(&mut self, name: &str) -> Result<(), SpdxError> {
        self.expect_top(Container::Object)?;
        self.separator()?;
        serde_json::to_writer(&mut self.out, name)?;
        self.raw(b":")
    }

    /// 최상위 객체를 엽니다.
    pub fn start_document(&mut self) -> Result<(), SpdxError> {
        if !self.stack.is_empty() {
            return Err(SpdxError::Serialization("document already started".to_owned()));
        }
        self.raw(b"{")?;
        self.stack.push(Frame {
            container: Container::Object,
            empty: true,
        });
        Ok(())
    }

    /// 현재 객체에 속성 하나를 씁니다.
    pub fn write_property<T: Serialize + ?Sized>(
        &mut self,
        name: &str,
        value: &T,
    ) -> Result<(), SpdxError> {
        self.key(name)?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    /// 현재 객체에 이름 있는 배열을 엽니다.
    pub fn start_array(&mut self, name: &str) -> Result<(), SpdxError> {
        self.key(name)?;
        self.raw(b"[")?;
        self.stack.push(Frame {
            container: Container::Array,
            empty: true,
        });
        Ok(())
    }

    /// 현재 배열에 요소 하나를 씁니다.
    pub fn write_element<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), SpdxError> {
        self.expect_top(Container::Array)?;
        // 인코딩 실패 시 구분자만 남지 않도록 먼저 직렬화
        let encoded = serde_json::to_vec(value)?;
        self.separator()?;
        self.raw(&encoded)
    }

    pub fn end_array(&mut self) -> Result<(), SpdxError> {
        self.expect_top(Container::Array)?;
        self.stack.pop();
        self.raw(b"]")
    }

    /// 최상위 객체를 닫고 버퍼를 비웁니다.
    pub fn end_document(&mut self) -> Result<(), SpdxError> {
        self.expect_top(Container::Object)?;
        if self.stack.len() != 1 {
            return Err(SpdxError::Serialization("unclosed array at end of document".to_owned()));
        }
        self.stack.pop();
        self.raw(b"\n}\n")?;
        self.out.flush().map_err(|e| self.io(e))
    }

    /// 현재 중첩 깊이
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn finish(writer: ManifestWriter<Vec<u8>>) -> Value {
        serde_json::from_slice(&writer.into_inner()).unwrap()
    }

    #[test]
    fn writes_nested_arrays_and_properties() {
        let mut writer = ManifestWriter::new(Vec::new(), "test");
        writer.start_document().unwrap();
        writer.start_array("files").unwrap();
        writer.write_element(&json!({"a": 1})).unwrap();
        writer.write_element(&json!({"b": 2})).unwrap();
        writer.end_array().unwrap();
        writer.start_array("packages").unwrap();
        writer.end_array().unwrap();
        writer.write_property("name", "doc").unwrap();
        writer.end_document().unwrap();

        let doc = finish(writer);
        assert_eq!(doc["files"].as_array().unwrap().len(), 2);
        assert_eq!(doc["packages"], json!([]));
        assert_eq!(doc["name"], "doc");
    }

    #[test]
    fn keys_are_escaped() {
        let mut writer = ManifestWriter::new(Vec::new(), "test");
        writer.start_document().unwrap();
        writer.write_property("@context", &json!(["x"])).unwrap();
        writer.write_property("quo\"te", &1).unwrap();
        writer.end_document().unwrap();
        let doc = finish(writer);
        assert_eq!(doc["quo\"te"], 1);
    }

    #[test]
    fn element_outside_array_is_rejected() {
        let mut writer = ManifestWriter::new(Vec::new(), "test");
        writer.start_document().unwrap();
        assert!(writer.write_element(&json!({})).is_err());
    }

    #[test]
    fn unclosed_array_is_rejected() {
        let mut writer = ManifestWriter::new(Vec::new(), "test");
        writer.start_document().unwrap();
        writer.start_array("files").unwrap();
        assert!(writer.end_document().is_err());
        assert_eq!(writer.depth(), 2);
    }
}
