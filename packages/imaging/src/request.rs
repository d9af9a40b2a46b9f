use std::collections::HashMap;

/// Transform parameters extracted from a read request.
///
/// Every field is optional. Parsing never fails: a value that does not parse
/// as its expected type is treated as absent, exactly like a missing key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Gaussian blur radius. Only strictly positive values trigger the stage.
    pub blur: Option<f32>,
    pub brightness: Option<f32>,
    pub contrast: Option<f32>,
    pub grayscale: bool,
    pub sepia: bool,
    pub invert: bool,
    /// Clockwise rotation in degrees.
    pub rotate: Option<f32>,
    pub fliph: bool,
    pub flipv: bool,
    /// Requested output encoding token, validated later by the negotiator.
    pub format: Option<String>,
}

impl TransformRequest {
    /// Build a request from raw query pairs. When a key repeats, the first
    /// value wins; unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut first: HashMap<String, String> = HashMap::new();
        for (key, value) in pairs {
            first
                .entry(key.as_ref().to_string())
                .or_insert_with(|| value.as_ref().to_string());
        }
        let get = |name: &str| first.get(name).map(String::as_str);

        Self {
            width: get("width").and_then(parse_dimension),
            height: get("height").and_then(parse_dimension),
            blur: get("blur").and_then(parse_float),
            brightness: get("brightness").and_then(parse_float),
            contrast: get("contrast").and_then(parse_float),
            grayscale: parse_flag(get("grayscale")),
            sepia: parse_flag(get("sepia")),
            invert: parse_flag(get("invert")),
            rotate: get("rotate").and_then(parse_float),
            fliph: parse_flag(get("fliph")),
            flipv: parse_flag(get("flipv")),
            format: get("format")
                .filter(|f| !f.is_empty())
                .map(str::to_string),
        }
    }
}

fn parse_dimension(raw: &str) -> Option<u32> {
    raw.parse().ok()
}

/// Finite floats only; `NaN` and `inf` parse in Rust but carry no usable value.
fn parse_float(raw: &str) -> Option<f32> {
    raw.parse::<f32>().ok().filter(|v| v.is_finite())
}

fn parse_flag(raw: Option<&str>) -> bool {
    raw == Some("true")
}
