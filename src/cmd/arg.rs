/// Why a token could not be read as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArgError {
    /// Empty digits, a digit outside the radix, or a value that does not fit in 32 bits.
    NotANumber,
}

/// Parses a numeric argument.
///
/// * `0x1F` is hexadecimal. The `x` and the digits `A`-`F` are case sensitive.
/// * `0101b` is binary.
/// * Anything else is decimal with an optional leading `-`.
///
/// Hexadecimal and binary accept any 32-bit pattern and reinterpret it as two's complement, so
/// `0xFFFFFFFF` is `-1`. Decimal values must fit in an `i32`.
pub fn parse_arg(token: &str) -> Result<i32, ArgError> {
    if let Some(hex) = token.strip_prefix("0x") {
        let bits = accumulate(hex, 16, |c| match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        })?;
        Ok(bits as i32)
    } else if let Some(bin) = token.strip_suffix('b') {
        let bits = accumulate(bin, 2, |c| match c {
            b'0' | b'1' => Some(c - b'0'),
            _ => None,
        })?;
        Ok(bits as i32)
    } else {
        let (negative, digits) = match token.strip_prefix('-') {
            Some(digits) => (true, digits),
            None => (false, token),
        };
        let magnitude = accumulate(digits, 10, |c| match c {
            b'0'..=b'9' => Some(c - b'0'),
            _ => None,
        })?;
        let value = if negative {
            0i64 - i64::from(magnitude)
        } else {
            i64::from(magnitude)
        };
        i32::try_from(value).map_err(|_| ArgError::NotANumber)
    }
}

fn accumulate(digits: &str, radix: u32, digit: impl Fn(u8) -> Option<u8>) -> Result<u32, ArgError> {
    if digits.is_empty() {
        return Err(ArgError::NotANumber);
    }
    digits.bytes().try_fold(0u32, |acc, c| {
        let d = digit(c).ok_or(ArgError::NotANumber)?;
        acc.checked_mul(radix)
            .and_then(|acc| acc.checked_add(u32::from(d)))
            .ok_or(ArgError::NotANumber)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal() {
        assert_eq!(parse_arg("0"), Ok(0));
        assert_eq!(parse_arg("255"), Ok(255));
        assert_eq!(parse_arg("-100"), Ok(-100));
        assert_eq!(parse_arg("2147483647"), Ok(i32::MAX));
        assert_eq!(parse_arg("-2147483648"), Ok(i32::MIN));
    }

    #[test]
    fn hexadecimal_is_upper_case_only() {
        assert_eq!(parse_arg("0x20"), Ok(0x20));
        assert_eq!(parse_arg("0xFF"), Ok(255));
        assert_eq!(parse_arg("0xff"), Err(ArgError::NotANumber));
        assert_eq!(parse_arg("0XFF"), Err(ArgError::NotANumber));
        assert_eq!(parse_arg("0xFFFFFFFF"), Ok(-1));
        assert_eq!(parse_arg("0x100000000"), Err(ArgError::NotANumber));
    }

    #[test]
    fn binary() {
        assert_eq!(parse_arg("1010b"), Ok(10));
        assert_eq!(parse_arg("0b"), Ok(0));
        assert_eq!(parse_arg("1021b"), Err(ArgError::NotANumber));
    }

    #[test]
    fn rejects_junk() {
        for tok in ["", "-", "0x", "b", "12a", "--1", "+5", "1.5", "-0x10"] {
            assert_eq!(parse_arg(tok), Err(ArgError::NotANumber), "{tok:?}");
        }
    }

    #[test]
    fn decimal_overflow() {
        assert_eq!(parse_arg("2147483648"), Err(ArgError::NotANumber));
        assert_eq!(parse_arg("-2147483649"), Err(ArgError::NotANumber));
        assert_eq!(parse_arg("99999999999"), Err(ArgError::NotANumber));
    }
}
