//! Special functions behind the Student's t distribution.

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const CF_MAX_ITERATIONS: usize = 300;
const CF_EPSILON: f64 = 1e-15;
const CF_TINY: f64 = 1e-300;

/// Natural log of the gamma function (Lanczos approximation, g = 7).
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula.
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).abs().ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + LANCZOS_G + 0.5;
    let series = LANCZOS_COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(LANCZOS_COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));

    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
}

/// Regularized incomplete beta function `I_x(a, b)` for `a, b > 0`.
///
/// Uses the continued fraction expansion (modified Lentz), switching to the
/// symmetry `I_x(a, b) = 1 - I_{1-x}(b, a)` where that converges faster.
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = nonzero(1.0 - qab * x / qap).recip();
    let mut h = d;

    for m in 1..=CF_MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        // Even step.
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = nonzero(1.0 + aa * d).recip();
        c = nonzero(1.0 + aa / c);
        h *= d * c;

        // Odd step.
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = nonzero(1.0 + aa * d).recip();
        c = nonzero(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < CF_EPSILON {
            return h;
        }
    }

    tracing::debug!(
        a,
        b,
        x,
        iterations = CF_MAX_ITERATIONS,
        "incomplete beta continued fraction did not converge"
    );
    h
}

fn nonzero(v: f64) -> f64 {
    if v.abs() < CF_TINY {
        CF_TINY
    } else {
        v
    }
}

/// Cumulative distribution function of Student's t with `df` degrees of freedom.
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    let x = df / (df + t * t);
    let tail = 0.5 * regularized_incomplete_beta(df / 2.0, 0.5, x);
    if t >= 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ln_gamma_known_values() {
        // Γ(1) = Γ(2) = 1, Γ(5) = 24, Γ(1/2) = √π
        assert!(ln_gamma(1.0).abs() < 1e-12);
        assert!(ln_gamma(2.0).abs() < 1e-12);
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-12);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-12);
    }

    #[test]
    fn incomplete_beta_bounds_and_symmetry() {
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 0.0), 0.0);
        assert_eq!(regularized_incomplete_beta(2.0, 3.0, 1.0), 1.0);
        let lhs = regularized_incomplete_beta(2.0, 3.0, 0.3);
        let rhs = 1.0 - regularized_incomplete_beta(3.0, 2.0, 0.7);
        assert!((lhs - rhs).abs() < 1e-12);
    }

    #[test]
    fn incomplete_beta_closed_form() {
        // I_x(1, b) = 1 - (1 - x)^b
        let x: f64 = 0.35;
        let expected = 1.0 - (1.0 - x).powf(4.0);
        assert!((regularized_incomplete_beta(1.0, 4.0, x) - expected).abs() < 1e-12);
    }

    #[test]
    fn incomplete_beta_past_iteration_cap_is_still_a_probability() {
        // a = b = 1e6 needs more continued-fraction terms than the cap allows;
        // the normal approximation gives Φ(-0.0283) ≈ 0.4887.
        let v = regularized_incomplete_beta(1e6, 1e6, 0.49999);
        assert!(v.is_finite());
        assert!((v - 0.4887).abs() < 0.01, "{v}");
    }

    #[test]
    fn t_cdf_is_symmetric_around_zero() {
        assert!((student_t_cdf(0.0, 7.0) - 0.5).abs() < 1e-12);
        let up = student_t_cdf(1.3, 7.0);
        let down = student_t_cdf(-1.3, 7.0);
        assert!((up + down - 1.0).abs() < 1e-12);
    }

    #[test]
    fn t_cdf_matches_cauchy_for_one_degree_of_freedom() {
        // df = 1 is the Cauchy distribution: CDF(t) = 1/2 + atan(t)/π
        for t in [0.5f64, 1.0, 3.0, -2.0] {
            let expected = 0.5 + t.atan() / std::f64::consts::PI;
            assert!((student_t_cdf(t, 1.0) - expected).abs() < 1e-10, "t = {t}");
        }
    }
}
