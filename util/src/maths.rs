//! Utility maths functions
//!
//! Polynomials are represented by their coefficients, lowest power first,
//! i.e. `[c0, c1, c2]` is `c0 + c1*x + c2*x^2`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Evaluate the polynomial at `value`.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    // Horner's method, starting from the highest power
    coeffs
        .iter()
        .rev()
        .fold(T::zero(), |acc, &c| acc * value + c)
}

/// Evaluate the first derivative of the polynomial at `value`.
pub fn poly_deriv<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    let mut res = T::zero();

    for (i, &c) in coeffs.iter().enumerate().skip(1).rev() {
        res = res * value + c * from_usize(i);
    }

    res
}

/// Evaluate the second derivative of the polynomial at `value`.
pub fn poly_second_deriv<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    let mut res = T::zero();

    for (i, &c) in coeffs.iter().enumerate().skip(2).rev() {
        res = res * value + c * from_usize(i * (i - 1));
    }

    res
}

/// Wrap an angle into the range [-pi, pi).
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float
{
    let pi = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau = pi + pi;

    rem_euclid(angle + pi, tau) - pi
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

fn from_usize<T: Float>(value: usize) -> T {
    T::from(value).unwrap_or_else(T::nan)
}
