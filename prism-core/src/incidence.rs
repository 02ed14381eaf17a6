use crate::errors::Error;

/// Converts an ordered table of annual incidences (hazards) into the
/// marginal survivor function via cumulative-hazard summation:
/// `S(i) = exp(-sum_{j<=i} h_j)`, with `S(0) = 1` by construction.
///
/// `rows` must be `(ageYrs, hazard)` pairs for `ageYrs = 0, 1, ..., A`, in
/// strictly increasing, contiguous order starting from 0, with
/// `hazard[0] == 0` and every hazard non-negative. This is a pure table
/// transform with no state to own, so it is a free function rather than a
/// single-method object.
pub fn annual_incidence_to_survivor(rows: &[(u32, f64)]) -> Result<(Vec<f64>, Vec<f64>), Error> {
    if rows.is_empty() {
        return Err(Error::invalid_input(
            "annual incidence table must contain at least the ageYrs=0 row",
        ));
    }

    for (expected_age, &(age, hazard)) in rows.iter().enumerate() {
        if age as usize != expected_age {
            return Err(Error::invalid_input(format!(
                "annual incidence rows must be contiguous from ageYrs=0; expected ageYrs={}, got {}",
                expected_age, age
            )));
        }
        if hazard < 0.0 {
            return Err(Error::invalid_input(format!(
                "hazard at ageYrs={} is negative ({})",
                age, hazard
            )));
        }
    }
    if rows[0].1 != 0.0 {
        return Err(Error::invalid_input("hazard at ageYrs=0 must be exactly 0"));
    }

    let mut times = Vec::with_capacity(rows.len());
    let mut surv = Vec::with_capacity(rows.len());
    let mut cum_hazard = 0.0;
    for &(age, hazard) in rows {
        cum_hazard += hazard;
        times.push(age as f64);
        surv.push((-cum_hazard).exp());
    }

    Ok((times, surv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn converts_cumulative_hazard() {
        let rows = vec![(0, 0.0), (1, 0.01), (2, 0.02), (3, 0.015)];
        let (times, surv) = annual_incidence_to_survivor(&rows).unwrap();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
        assert_relative_eq!(surv[0], 1.0);
        assert_relative_eq!(surv[1], (-0.01f64).exp());
        assert_relative_eq!(surv[2], (-0.03f64).exp());
        assert_relative_eq!(surv[3], (-0.045f64).exp());
        assert!(surv.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn rejects_nonzero_first_hazard() {
        let rows = vec![(0, 0.01), (1, 0.02)];
        assert!(annual_incidence_to_survivor(&rows).is_err());
    }

    #[test]
    fn rejects_gap_in_ages() {
        let rows = vec![(0, 0.0), (2, 0.02)];
        assert!(annual_incidence_to_survivor(&rows).is_err());
    }

    #[test]
    fn rejects_negative_hazard() {
        let rows = vec![(0, 0.0), (1, -0.01)];
        assert!(annual_incidence_to_survivor(&rows).is_err());
    }

    #[test]
    fn rejects_empty_table() {
        assert!(annual_incidence_to_survivor(&[]).is_err());
    }
}
