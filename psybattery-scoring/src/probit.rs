/// z-score substituted for a rate of exactly 0 or 1 (99.5th percentile).
pub const Z_CLIP: f64 = 2.576;

/// z-transform of a hit or false-alarm rate. Degenerate rates map to
/// `∓Z_CLIP` instead of infinity.
pub fn z_score(rate: f64) -> f64 {
    if !(rate > 0.0) {
        -Z_CLIP
    } else if rate >= 1.0 {
        Z_CLIP
    } else {
        inverse_normal_cdf(rate)
    }
}

/// Acklam's rational approximation of the standard normal quantile function.
/// Relative error stays around 1e-9 on (0, 1), well inside what d′ needs.
/// Returns `±inf` at the closed ends.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];

    const P_LOW: f64 = 0.02425;
    const P_HIGH: f64 = 1.0 - P_LOW;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        return tail((-2.0 * p.ln()).sqrt());
    }
    if p > P_HIGH {
        return -tail((-2.0 * (1.0 - p).ln()).sqrt());
    }

    let q = p - 0.5;
    let r = q * q;
    (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
        / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_reference_quantiles() {
        let cases = [
            (0.5, 0.0),
            (0.841_344_746, 1.0),
            (0.975, 1.959_963_985),
            (0.995, 2.575_829_304),
            (0.01, -2.326_347_874),
            (0.001, -3.090_232_306),
        ];
        for (p, z) in cases {
            let got = inverse_normal_cdf(p);
            assert!((got - z).abs() < 1e-4, "p={p} got={got} want={z}");
        }
    }

    #[test]
    fn symmetric_around_median() {
        for p in [0.01, 0.1, 0.3, 0.45] {
            let lo = inverse_normal_cdf(p);
            let hi = inverse_normal_cdf(1.0 - p);
            assert!((lo + hi).abs() < 1e-8, "p={p}");
        }
    }

    #[test]
    fn degenerate_rates_are_clipped() {
        assert_eq!(z_score(0.0), -Z_CLIP);
        assert_eq!(z_score(1.0), Z_CLIP);
        assert_eq!(z_score(f64::NAN), -Z_CLIP);
        assert!(inverse_normal_cdf(0.0).is_infinite());
        assert!((z_score(0.5)).abs() < 1e-12);
    }
}
