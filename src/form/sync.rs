use crate::geometry::CropRegion;

use super::Coordinate;

const SLIDER_MIN: i32 = 0;
const SLIDER_MAX: i32 = 100;

/// Leading-integer coercion used for every numeric coordinate field.
///
/// Accepts optional surrounding whitespace, an optional sign and leading
/// digits; trailing garbage is ignored. Input without leading digits yields 0.
pub fn coerce_int(raw: &str) -> i32 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let run: Vec<u8> = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .collect();
    if run.is_empty() {
        return 0;
    }
    // Saturates; oversized runs clamp to the i32 bounds below.
    let magnitude = run.iter().fold(0i64, |acc, digit| {
        acc.saturating_mul(10).saturating_add(i64::from(digit - b'0'))
    });
    let value = if negative { -magnitude } else { magnitude };
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// A slider and a numeric text field that always show the same coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DualInput {
    slider: i32,
    number: String,
}

impl DualInput {
    pub fn new(value: i32) -> Self {
        let mut input = Self {
            slider: SLIDER_MIN,
            number: String::new(),
        };
        input.set_both(value);
        input
    }

    pub fn slider(&self) -> i32 {
        self.slider
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    /// Value read by the preview renderer: the numeric field, coerced.
    pub fn value(&self) -> i32 {
        coerce_int(&self.number)
    }

    pub fn set_from_slider(&mut self, value: i32) {
        self.slider = value.clamp(SLIDER_MIN, SLIDER_MAX);
        self.number = self.slider.to_string();
    }

    /// Keeps the typed text untouched and moves the slider to its coerced value.
    pub fn set_from_number(&mut self, raw: &str) {
        self.number = raw.to_string();
        self.slider = coerce_int(raw).clamp(SLIDER_MIN, SLIDER_MAX);
    }

    pub fn set_both(&mut self, value: i32) {
        self.slider = value.clamp(SLIDER_MIN, SLIDER_MAX);
        self.number = value.to_string();
    }
}

/// The four coordinate pairs of the crop form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateInputs {
    pairs: [DualInput; 4],
}

impl CoordinateInputs {
    pub fn new(region: CropRegion) -> Self {
        Self {
            pairs: [
                DualInput::new(region.x_start),
                DualInput::new(region.x_end),
                DualInput::new(region.y_start),
                DualInput::new(region.y_end),
            ],
        }
    }

    pub fn get(&self, coordinate: Coordinate) -> &DualInput {
        &self.pairs[coordinate.index()]
    }

    pub fn get_mut(&mut self, coordinate: Coordinate) -> &mut DualInput {
        &mut self.pairs[coordinate.index()]
    }

    pub fn set_region(&mut self, region: CropRegion) {
        for coordinate in Coordinate::ALL {
            self.get_mut(coordinate).set_both(coordinate.of(region));
        }
    }

    /// Region as displayed; ordering is never corrected here.
    pub fn region(&self) -> CropRegion {
        CropRegion::new(
            self.get(Coordinate::XStart).value(),
            self.get(Coordinate::XEnd).value(),
            self.get(Coordinate::YStart).value(),
            self.get(Coordinate::YEnd).value(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_int_follows_leading_integer_rules() {
        assert_eq!(coerce_int("42"), 42);
        assert_eq!(coerce_int("  17px"), 17);
        assert_eq!(coerce_int("12.9"), 12);
        assert_eq!(coerce_int("-5"), -5);
        assert_eq!(coerce_int("+8"), 8);
        assert_eq!(coerce_int(""), 0);
        assert_eq!(coerce_int("abc"), 0);
        assert_eq!(coerce_int("-"), 0);
    }

    #[test]
    fn coerce_int_saturates_oversized_digit_runs() {
        assert_eq!(coerce_int("1099511627776"), i32::MAX);
        assert_eq!(coerce_int("100000000000000000000"), i32::MAX);
        assert_eq!(coerce_int("-100000000000000000000abc"), i32::MIN);
    }

    #[test]
    fn slider_change_overwrites_number_field() {
        let mut input = DualInput::new(0);
        for value in [0, 1, 37, 99, 100] {
            input.set_from_slider(value);
            assert_eq!(input.number(), value.to_string());
            assert_eq!(input.value(), value);
        }
    }

    #[test]
    fn number_change_overwrites_slider() {
        let mut input = DualInput::new(50);
        for value in [0, 12, 64, 100] {
            input.set_from_number(&value.to_string());
            assert_eq!(input.slider(), value);
        }
    }

    #[test]
    fn non_numeric_number_input_is_treated_as_zero() {
        let mut input = DualInput::new(50);
        input.set_from_number("oops");
        assert_eq!(input.number(), "oops");
        assert_eq!(input.slider(), 0);
        assert_eq!(input.value(), 0);
    }

    #[test]
    fn region_reads_numeric_fields_without_reordering() {
        let mut inputs = CoordinateInputs::new(CropRegion::FULL);
        inputs.get_mut(Coordinate::XStart).set_from_number("80");
        inputs.get_mut(Coordinate::XEnd).set_from_slider(20);
        assert_eq!(inputs.region(), CropRegion::new(80, 20, 0, 100));
    }
}
