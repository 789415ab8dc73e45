//! Reply decoders shared by the facades. Each one accepts exactly the reply
//! shapes its commands produce and maps anything else to `UnexpectedResponse`.

use kvd_client::{DriverError, DriverResult, RespValue};

pub(crate) fn ok(reply: RespValue) -> DriverResult<()> {
    match reply {
        RespValue::Simple(_) => Ok(()),
        _ => Err(DriverError::UnexpectedResponse),
    }
}

pub(crate) fn integer(reply: RespValue) -> DriverResult<i64> {
    match reply {
        RespValue::Integer(value) => Ok(value),
        _ => Err(DriverError::UnexpectedResponse),
    }
}

pub(crate) fn optional_integer(reply: RespValue) -> DriverResult<Option<i64>> {
    match reply {
        RespValue::Integer(value) => Ok(Some(value)),
        RespValue::Bulk(None) | RespValue::Array(None) => Ok(None),
        _ => Err(DriverError::UnexpectedResponse),
    }
}

pub(crate) fn text(reply: RespValue) -> DriverResult<String> {
    match reply {
        RespValue::Simple(data) | RespValue::Bulk(Some(data)) => utf8(data),
        _ => Err(DriverError::UnexpectedResponse),
    }
}

pub(crate) fn optional_text(reply: RespValue) -> DriverResult<Option<String>> {
    match reply {
        RespValue::Bulk(None) => Ok(None),
        other => text(other).map(Some),
    }
}

pub(crate) fn text_list(reply: RespValue) -> DriverResult<Vec<String>> {
    array(reply)?.into_iter().map(text).collect()
}

pub(crate) fn optional_text_list(reply: RespValue) -> DriverResult<Vec<Option<String>>> {
    array(reply)?.into_iter().map(optional_text).collect()
}

pub(crate) fn array(reply: RespValue) -> DriverResult<Vec<RespValue>> {
    match reply {
        RespValue::Array(Some(items)) => Ok(items),
        _ => Err(DriverError::UnexpectedResponse),
    }
}

pub(crate) fn utf8(data: Vec<u8>) -> DriverResult<String> {
    String::from_utf8(data).map_err(|_| DriverError::UnexpectedResponse)
}
