use std::collections::BTreeMap;

use cx_core::{CodexError, CxValue};
use rhai::{Array, Dynamic, ImmutableString, Map, FLOAT, INT};

pub(crate) fn rhai_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    out
}

pub(crate) fn cxvalue_to_dynamic(value: &CxValue) -> Dynamic {
    match value {
        CxValue::Nil => Dynamic::UNIT,
        CxValue::Bool(value) => Dynamic::from_bool(*value),
        CxValue::Int(value) => Dynamic::from_int(*value),
        CxValue::Number(value) => Dynamic::from_float(*value),
        CxValue::String(value) => Dynamic::from(value.clone()),
        CxValue::List(values) => {
            Dynamic::from_array(values.iter().map(cxvalue_to_dynamic).collect::<Array>())
        }
        CxValue::Map(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.as_str().into(), cxvalue_to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
    }
}

pub(crate) fn dynamic_to_cxvalue(value: Dynamic) -> Result<CxValue, CodexError> {
    let value = value.flatten();
    if value.is_unit() {
        return Ok(CxValue::Nil);
    }
    if value.is::<bool>() {
        return Ok(CxValue::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(CxValue::Int(value.cast::<INT>()));
    }
    if value.is::<FLOAT>() {
        return Ok(CxValue::Number(value.cast::<FLOAT>()));
    }
    if value.is::<ImmutableString>() {
        return Ok(CxValue::String(value.cast::<ImmutableString>().to_string()));
    }
    if value.is::<char>() {
        return Ok(CxValue::String(value.cast::<char>().to_string()));
    }
    if value.is::<Array>() {
        let array = value.cast::<Array>();
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            out.push(dynamic_to_cxvalue(item)?);
        }
        return Ok(CxValue::List(out));
    }
    if value.is::<Map>() {
        let map = value.cast::<Map>();
        let mut out = BTreeMap::new();
        for (key, value) in map {
            out.insert(key.to_string(), dynamic_to_cxvalue(value)?);
        }
        return Ok(CxValue::Map(out));
    }

    Err(CodexError::new(
        "SCRIPT_VALUE_UNSUPPORTED",
        format!("Unsupported script value of type \"{}\".", value.type_name()),
    ))
}

/// Equality used by the container helpers: values compare after bridging and
/// numbers compare by value, so `3` and `3.0` are the same item.
pub(crate) fn dynamic_items_equal(left: &Dynamic, right: &Dynamic) -> bool {
    match (
        dynamic_to_cxvalue(left.clone()),
        dynamic_to_cxvalue(right.clone()),
    ) {
        (Ok(left), Ok(right)) => match (left.as_number(), right.as_number()) {
            (Some(left), Some(right)) => left == right,
            _ => left == right,
        },
        _ => false,
    }
}
