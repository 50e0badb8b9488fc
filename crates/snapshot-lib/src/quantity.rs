//! Kubernetes resource quantity parsing
//!
//! Converts quantity strings such as `"250m"`, `"4"`, `"128Mi"` or `"1G"` into
//! exact numbers. Parsing is best-effort: anything that cannot be interpreted
//! yields `None` instead of an error.
//!
//! The unit is taken from the suffix:
//! - a trailing `i` selects a binary unit (`Ki`, `Mi`, `Gi`, ...) scaled by 1024
//! - any other trailing unit code is decimal (`m`, `K`, `M`, ...) scaled by 1000

/// Ordered magnitude alphabet, from 10^-24 up to 10^36.
/// The plain (suffix-less) unit sits at [`UNIT_SHIFT`].
const UNIT_ALPHABET: [char; 21] = [
    'y', 'z', 'a', 'f', 'p', 'n', 'μ', 'm', ' ', 'K', 'M', 'G', 'T', 'P', 'E', 'Z', 'Y', 'X', 'W',
    'V', 'U',
];

/// Index of the plain unit in [`UNIT_ALPHABET`]
const UNIT_SHIFT: i32 = 8;

const DECIMAL_BASE: i64 = 1000;
const BINARY_BASE: i64 = 1024;

/// How the parsed value should be represented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuantityMode {
    /// Keep integers exact (memory bytes, pod counts)
    #[default]
    Integer,
    /// Always produce a float (CPU cores)
    Fractional,
}

/// A parsed quantity value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    Integer(i64),
    Float(f64),
}

impl Quantity {
    /// Integral value, `None` when the quantity is fractional
    pub fn as_integer(&self) -> Option<i64> {
        match *self {
            Quantity::Integer(v) => Some(v),
            Quantity::Float(_) => None,
        }
    }

    /// Float value, `None` when the quantity is integral
    pub fn as_float(&self) -> Option<f64> {
        match *self {
            Quantity::Float(v) => Some(v),
            Quantity::Integer(_) => None,
        }
    }

    fn coerce(self, mode: QuantityMode) -> Self {
        match (self, mode) {
            (Quantity::Integer(v), QuantityMode::Fractional) => Quantity::Float(v as f64),
            (q, _) => q,
        }
    }
}

/// Parse a quantity token.
///
/// Returns `None` for an absent token, an unknown unit, a non-integer numeric
/// prefix, or a value that does not fit in an `i64`.
pub fn parse_quantity(token: Option<&str>, mode: QuantityMode) -> Option<Quantity> {
    let token = token?;

    if is_plain_integer(token) {
        return token
            .parse::<i64>()
            .ok()
            .map(|v| Quantity::Integer(v).coerce(mode));
    }

    let (prefix, unit, base) = split_unit(token)?;
    let power = unit_power(unit)?;
    let number: i64 = prefix.parse().ok()?;

    scale(number, base, power).map(|q| q.coerce(mode))
}

/// Parse a CPU quantity into fractional cores
pub fn parse_cpu(token: Option<&str>) -> Option<f64> {
    parse_quantity(token, QuantityMode::Fractional).and_then(|q| q.as_float())
}

/// Parse a memory (or count) quantity into an exact integer
pub fn parse_bytes(token: Option<&str>) -> Option<i64> {
    parse_quantity(token, QuantityMode::Integer).and_then(|q| q.as_integer())
}

fn is_plain_integer(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// Split a token into numeric prefix, unit code and scaling base
fn split_unit(token: &str) -> Option<(&str, char, i64)> {
    if let Some(rest) = token.strip_suffix('i') {
        let unit = rest.chars().next_back()?;
        let prefix = &rest[..rest.len() - unit.len_utf8()];
        Some((prefix, unit, BINARY_BASE))
    } else {
        let unit = token.chars().next_back()?;
        let prefix = &token[..token.len() - unit.len_utf8()];
        Some((prefix, unit, DECIMAL_BASE))
    }
}

fn unit_power(unit: char) -> Option<i32> {
    // Canonical Kubernetes spellings of kilo and micro
    let unit = match unit {
        'k' => 'K',
        'u' => 'μ',
        other => other,
    };

    UNIT_ALPHABET
        .iter()
        .position(|&c| c == unit)
        .map(|index| index as i32 - UNIT_SHIFT)
}

fn scale(number: i64, base: i64, power: i32) -> Option<Quantity> {
    if power >= 0 {
        let factor = base.checked_pow(power as u32)?;
        number.checked_mul(factor).map(Quantity::Integer)
    } else {
        let divisor = (base as f64).powi(-power);
        Some(Quantity::Float(number as f64 / divisor))
    }
}
