use num::bigint::{BigInt, BigUint, Sign};
use num::{Integer, One, Signed, Zero};

/// Smallest integer greater than or equal to num / den
///
/// Panics if den is zero, same as BigUint division
pub fn ceil_div(num: &BigUint, den: &BigUint) -> BigUint {
    let (quot, rem) = num.div_rem(den);
    if rem.is_zero() {
        quot
    } else {
        quot + 1_u8
    }
}

/// Largest integer less than or equal to num / den
pub fn floor_div(num: &BigUint, den: &BigUint) -> BigUint {
    num / den
}

/// Subtract rhs from lhs, clamping at zero
pub fn saturating_sub(lhs: &BigUint, rhs: &BigUint) -> BigUint {
    if lhs > rhs {
        lhs - rhs
    } else {
        BigUint::zero()
    }
}

/// Modular inverse of x mod m via the extended Euclidean algorithm
///
/// Returns None when x and m are not coprime
pub fn inv_mod(x: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }

    let modulus = BigInt::from_biguint(Sign::Plus, m.clone());
    let mut l: (BigInt, BigInt) = (BigInt::zero(), BigInt::one());
    let mut r: (BigInt, BigInt) = (
        modulus.clone(),
        BigInt::from_biguint(Sign::Plus, x % m),
    );

    while !r.1.is_zero() {
        let q = &r.0 / &r.1;
        l = (l.1.clone(), &l.0 - &q * &l.1);
        r = (r.1.clone(), &r.0 % &r.1);
    }

    if !r.0.is_one() {
        return None;
    }

    let mut inv = l.0 % &modulus;
    if inv.is_negative() {
        inv += &modulus;
    }
    inv.to_biguint()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_ceil_div() {
        let ten = BigUint::from(10_u8);
        assert_eq!(ceil_div(&ten, &BigUint::from(5_u8)), BigUint::from(2_u8));
        assert_eq!(ceil_div(&BigUint::from(99_u8), &BigUint::from(20_u8)), BigUint::from(5_u8));
        assert_eq!(ceil_div(&BigUint::zero(), &ten), BigUint::zero());
        assert_eq!(floor_div(&BigUint::from(99_u8), &BigUint::from(20_u8)), BigUint::from(4_u8));
    }

    #[test]
    fn check_saturating_sub() {
        let three = BigUint::from(3_u8);
        let five = BigUint::from(5_u8);
        assert_eq!(saturating_sub(&five, &three), BigUint::from(2_u8));
        assert_eq!(saturating_sub(&three, &five), BigUint::zero());
    }

    #[test]
    fn check_inv_mod() {
        // phi(257 * 263) = 256 * 262
        let phi = BigUint::from(67_072_u32);
        let e = BigUint::from(65_537_u32);
        assert_eq!(inv_mod(&e, &phi), Some(BigUint::from(63_489_u32)));

        assert_eq!(inv_mod(&BigUint::from(3_u8), &BigUint::from(11_u8)), Some(BigUint::from(4_u8)));
        assert_eq!(inv_mod(&BigUint::from(4_u8), &BigUint::from(8_u8)), None);
    }
}
