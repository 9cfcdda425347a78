use std::error::Error;

use tokio_postgres::types::{Format, IsNull, ToSql, Type, to_sql_checked};
use tokio_util::bytes;

/// A bind value sent in the text wire format.
///
/// Catalog bind variables are always strings; sending them as text lets the server
/// parse each one into whatever type it inferred for the placeholder, the way an
/// untyped libpq parameter behaves.
#[derive(Debug, Clone, Copy)]
pub struct TextParam<'a>(pub &'a str);

impl ToSql for TextParam<'_> {
    fn to_sql(
        &self,
        _ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        out.extend_from_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    fn encode_format(&self, _ty: &Type) -> Format {
        Format::Text
    }

    to_sql_checked!();
}

/// Wrap string binds for the driver.
pub fn text_params(binds: &[String]) -> impl ExactSizeIterator<Item = TextParam<'_>> {
    binds.iter().map(|b| TextParam(b.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_raw_text_for_any_type() {
        let mut buf = bytes::BytesMut::new();
        let param = TextParam("10013");
        assert!(matches!(param.to_sql(&Type::INT8, &mut buf), Ok(IsNull::No)));
        assert_eq!(&buf[..], b"10013");
        assert!(matches!(param.encode_format(&Type::INT8), Format::Text));
        assert!(<TextParam<'_> as ToSql>::accepts(&Type::TIMESTAMPTZ));
    }

    #[test]
    fn keeps_bind_order() {
        let binds = vec!["a".to_string(), "b".to_string()];
        let params: Vec<_> = text_params(&binds).map(|p| p.0).collect();
        assert_eq!(params, vec!["a", "b"]);
    }
}
