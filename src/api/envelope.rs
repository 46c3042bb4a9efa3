use serde::de::DeserializeOwned;
use serde_json::Value;

/// Normalized form of a backend success payload.
///
/// The backend's serializer is not consistent about collection shapes: the
/// same logical list can arrive as a bare JSON array, as an object wrapping
/// the array in a `$values` field (an artifact of its reference-preserving
/// serializer), or as a single object when there is exactly one element.
/// All three are folded into one shape here, at the gateway boundary, so no
/// call site ever branches on payload shape again.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope<T> {
    Empty,
    Sequence(Vec<T>),
}

impl<T> Envelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Envelope::Empty => Vec::new(),
            Envelope::Sequence(items) => items,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Envelope::Empty => 0,
            Envelope::Sequence(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fold a raw payload into an `Envelope`, accepting all three shapes the
/// backend is known to produce. `null` counts as empty.
pub fn normalize<T: DeserializeOwned>(value: Value) -> Result<Envelope<T>, serde_json::Error> {
    match value {
        Value::Null => Ok(Envelope::Empty),
        Value::Array(items) => decode_items(items),
        Value::Object(mut map) => {
            if let Some(inner) = map.remove("$values") {
                match inner {
                    Value::Array(items) => decode_items(items),
                    Value::Null => Ok(Envelope::Empty),
                    other => decode_items(vec![other]),
                }
            } else {
                // A single object is a one-element sequence.
                let item: T = serde_json::from_value(Value::Object(map))?;
                Ok(Envelope::Sequence(vec![item]))
            }
        }
        other => {
            let item: T = serde_json::from_value(other)?;
            Ok(Envelope::Sequence(vec![item]))
        }
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Envelope<T>, serde_json::Error> {
    if items.is_empty() {
        return Ok(Envelope::Empty);
    }
    let mut decoded = Vec::with_capacity(items.len());
    for item in items {
        decoded.push(serde_json::from_value(item)?);
    }
    Ok(Envelope::Sequence(decoded))
}
