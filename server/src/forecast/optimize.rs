const MAX_ITERATIONS_PER_DIMENSION: usize = 500;
const TOLERANCE: f64 = 1e-12;

/// Nelder-Mead minimisation of `f`, starting from a simplex around `start` with edges of `step`.
pub(crate) fn nelder_mead(f: impl Fn(&[f64]) -> f64, start: &[f64], step: f64) -> Vec<f64> {
    let n = start.len();
    if n == 0 {
        return Vec::new();
    }

    let mut simplex = std::iter::once(start.to_vec())
        .chain((0..n).map(|i| {
            let mut vertex = start.to_vec();
            vertex[i] += step;
            vertex
        }))
        .map(|vertex| {
            let value = f(&vertex);
            (vertex, value)
        })
        .collect::<Vec<_>>();

    for _ in 0..MAX_ITERATIONS_PER_DIMENSION * n {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let (best, second_worst, worst) = (simplex[0].1, simplex[n - 1].1, simplex[n].1);
        if worst - best <= TOLERANCE {
            break;
        }

        let centroid = (0..n)
            .map(|j| simplex[..n].iter().map(|(x, _)| x[j]).sum::<f64>() / n as f64)
            .collect::<Vec<_>>();
        let worst_vertex = simplex[n].0.clone();
        let towards_worst = |coefficient: f64| {
            centroid
                .iter()
                .zip(&worst_vertex)
                .map(|(c, w)| c + coefficient * (w - c))
                .collect::<Vec<_>>()
        };

        let reflected = towards_worst(-1.0);
        let reflected_value = f(&reflected);
        if reflected_value < best {
            let expanded = towards_worst(-2.0);
            let expanded_value = f(&expanded);
            simplex[n] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
        } else if reflected_value < second_worst {
            simplex[n] = (reflected, reflected_value);
        } else {
            let contracted = if reflected_value < worst {
                towards_worst(-0.5)
            } else {
                towards_worst(0.5)
            };
            let contracted_value = f(&contracted);
            if contracted_value < reflected_value.min(worst) {
                simplex[n] = (contracted, contracted_value);
            } else {
                let best_vertex = simplex[0].0.clone();
                for (vertex, value) in simplex.iter_mut().skip(1) {
                    for (x, b) in vertex.iter_mut().zip(&best_vertex) {
                        *x = b + 0.5 * (*x - b);
                    }
                    *value = f(vertex);
                }
            }
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    simplex.swap_remove(0).0
}
