//! Ray certificates.
//!
//! A termination record holds only an index and a sign; the full vector is
//! materialized on demand against the factorization that is still valid from
//! the solve, then cached until a mutation invalidates it.
//!
//! Sign convention for the dual ray y: positive entries pull on row lower
//! bounds, negative entries on row upper bounds, and the certified
//! contradiction is Σᵢ yᵢ·bᵢ* > 0 while yᵀA x stays nonpositive over the
//! column bounds.

use crate::linalg::WorkVector;
use crate::model::Model;
use crate::status::{CoreError, CoreResult};

impl Model {
    /// True when the last solve recorded a dual ray (primal infeasibility
    /// certificate). Does not materialize the vector.
    pub fn has_dual_ray(&self) -> bool {
        self.engine().dual_ray.is_some()
    }

    /// True when the last solve recorded a primal ray (unboundedness
    /// certificate).
    pub fn has_primal_ray(&self) -> bool {
        self.engine().primal_ray.is_some()
    }

    /// Materialize the dual ray: y = sign · B⁻ᵀ e_row, unscaled to the
    /// original row space. Cached after the first call.
    pub fn get_dual_ray(&mut self) -> CoreResult<Vec<f64>> {
        let m = self.num_row();
        let scale_row: Vec<f64> = self.last_scale_rows();
        let engine = self.engine_mut();
        let record = engine
            .dual_ray
            .as_ref()
            .ok_or_else(|| CoreError::MissingState("no dual ray is available".to_string()))?;
        if let Some(cached) = &record.value {
            return Ok(cached.clone());
        }
        if !engine.factor.is_built() {
            return Err(CoreError::MissingState(
                "factorization no longer valid for ray extraction".to_string(),
            ));
        }
        let (index, sign) = (record.index, record.sign);
        let mut rhs = WorkVector::new(m);
        rhs.insert(index, 1.0);
        engine.factor.btran(&mut rhs, 1.0);
        let mut ray = vec![0.0; m];
        for i in 0..m {
            // Scaled rows price as r_i·(row i of A); the ray entry unscales
            // by the same factor.
            ray[i] = sign * rhs.array[i] * scale_row[i];
        }
        if let Some(record) = engine.dual_ray.as_mut() {
            record.value = Some(ray.clone());
        }
        Ok(ray)
    }

    /// Materialize the primal ray direction x̂: −sign at the recorded column
    /// and the FTRANed column scattered over the basic structurals.
    pub fn get_primal_ray(&mut self) -> CoreResult<Vec<f64>> {
        let n = self.num_col();
        let m = self.num_row();
        let scale_col: Vec<f64> = self.last_scale_cols();
        let engine = self.engine_mut();
        let record = engine
            .primal_ray
            .as_ref()
            .ok_or_else(|| CoreError::MissingState("no primal ray is available".to_string()))?;
        if let Some(cached) = &record.value {
            return Ok(cached.clone());
        }
        let (col, sign) = (record.index, record.sign);

        let mut ray = vec![0.0; n];
        if m == 0 {
            if col < n {
                ray[col] = -sign * scale_col[col];
            }
        } else {
            if !engine.factor.is_built() {
                return Err(CoreError::MissingState(
                    "factorization no longer valid for ray extraction".to_string(),
                ));
            }
            let mut rhs = WorkVector::new(m);
            for (i, v) in engine.variable_column(col) {
                rhs.insert(i, sign * v);
            }
            engine.factor.ftran(&mut rhs, 1.0);
            for p in 0..m {
                let var = engine.basis.basic_index[p];
                if var < n {
                    ray[var] = rhs.array[p];
                }
            }
            if col < n {
                ray[col] = -sign;
            }
            for (j, r) in ray.iter_mut().enumerate() {
                *r *= scale_col[j];
            }
        }
        if let Some(record) = engine.primal_ray.as_mut() {
            record.value = Some(ray.clone());
        }
        Ok(ray)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Model;
    use crate::status::ModelStatus;

    #[test]
    fn test_infeasible_lp_has_dual_ray() {
        // x >= 1 and x <= 0 with x free: plainly infeasible.
        let mut model = Model::new();
        model
            .add_col(0.0, f64::NEG_INFINITY, f64::INFINITY, &[], &[])
            .unwrap();
        model.add_row(1.0, f64::INFINITY, &[0], &[1.0]).unwrap();
        model.add_row(f64::NEG_INFINITY, 0.0, &[0], &[1.0]).unwrap();

        let status = model.run().unwrap();
        assert_eq!(status, ModelStatus::Infeasible);
        assert!(model.has_dual_ray());

        let ray = model.get_dual_ray().unwrap();
        assert_eq!(ray.len(), 2);
        // Opposite signs on the two rows.
        assert!(ray[0] * ray[1] < 0.0, "ray = {:?}", ray);
        // y^T A must vanish on the free column.
        let combo = ray[0] + ray[1];
        assert!(combo.abs() < 1e-7, "ray = {:?}", ray);
        // The certified bound combination is strictly violated.
        let mut rhs = 0.0;
        for (i, &y) in ray.iter().enumerate() {
            let bound = if y > 0.0 {
                model.lp().row_lower[i]
            } else {
                model.lp().row_upper[i]
            };
            rhs += y * bound;
        }
        assert!(rhs > 1e-7, "certificate rhs = {}", rhs);
    }

    #[test]
    fn test_unbounded_lp_has_primal_ray() {
        // min -x  s.t.  x - y <= 2, x, y >= 0: ray along (1, 1).
        let mut model = Model::new();
        model.add_col(-1.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
        model.add_col(0.0, 0.0, f64::INFINITY, &[], &[]).unwrap();
        model
            .add_row(f64::NEG_INFINITY, 2.0, &[0, 1], &[1.0, -1.0])
            .unwrap();

        let status = model.run().unwrap();
        assert_eq!(status, ModelStatus::Unbounded);
        assert!(model.has_primal_ray());

        let ray = model.get_primal_ray().unwrap();
        assert_eq!(ray.len(), 2);
        // The ray must be a feasible improving direction: A·ray <= 0 on the
        // <= row, ray >= 0, and cost·ray < 0.
        let a_ray = ray[0] - ray[1];
        assert!(a_ray < 1e-7, "ray = {:?}", ray);
        assert!(ray[0] >= -1e-9 && ray[1] >= -1e-9);
        assert!(-ray[0] < -1e-9, "cost direction not improving: {:?}", ray);
    }
}
