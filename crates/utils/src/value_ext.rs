/// Extends primitives with more specific formatting options
pub trait ValueExt {
    /// Better scientific number formatting
    ///
    /// Reduced tables are written with a fixed number of decimals and a
    /// signed, padded exponent so that columns line up regardless of sign or
    /// magnitude.
    ///
    /// Works for anything that can be represented as scientific using the
    /// `LowerExp` trait, which is pretty much every numerical primitive.
    ///
    /// ```rust
    /// # use vsans_utils::ValueExt;
    /// assert_eq!((0.0123).sci(4, 2), "1.2300e-02".to_string());
    /// assert_eq!((-150.0).sci(4, 2), "-1.5000e+02".to_string());
    /// ```
    fn sci(&self, precision: usize, exp_pad: usize) -> String;
}

impl<T: std::fmt::LowerExp> ValueExt for T {
    fn sci(&self, precision: usize, exp_pad: usize) -> String {
        let mut num = format!("{self:.precision$e}");
        // non-finite values have no exponent to pad
        let Some(split) = num.find('e') else {
            return num;
        };
        let exp = num.split_off(split);
        // Make sure the exponent is signed
        let (sign, exp) = match exp.strip_prefix("e-") {
            Some(exp) => ('-', exp),
            None => ('+', &exp[1..]),
        };
        // Pad the exponent with zeros if needed and put it back on the number
        num.push_str(&format!("e{sign}{exp:0>exp_pad$}"));
        num
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_pass_through() {
        assert_eq!(f64::NAN.sci(4, 2), "NaN");
        assert_eq!(f64::INFINITY.sci(4, 2), "inf");
    }
}
