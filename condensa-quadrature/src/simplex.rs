//! Symmetric quadrature rules for the reference triangle `(0, 0), (1, 0), (0, 1)`.
use crate::{Error, Point2, Rule2d};

/// Points with barycentric coordinates `(a, a, 1 - 2a)` and all of their permutations,
/// expressed in reference coordinates `(ξ, η) = (λ1, λ2)`.
fn orbit_aab(a: f64) -> [Point2; 3] {
    let b = 1.0 - 2.0 * a;
    [[a, a], [b, a], [a, b]]
}

fn push_orbit(rule: &mut Rule2d, a: f64, weight: f64) {
    for point in orbit_aab(a) {
        rule.0.push(weight);
        rule.1.push(point);
    }
}

/// Returns a quadrature rule on the reference triangle that integrates every polynomial of
/// total degree at most `strength` exactly.
///
/// Rules are available for strengths up to 4. Strength 0 returns the strength 1 rule.
pub fn triangle(strength: usize) -> Result<Rule2d, Error> {
    let mut rule = (Vec::new(), Vec::new());
    match strength {
        0 | 1 => {
            rule.0.push(0.5);
            rule.1.push([1.0 / 3.0, 1.0 / 3.0]);
        }
        2 => push_orbit(&mut rule, 1.0 / 6.0, 1.0 / 6.0),
        3 | 4 => {
            // Dunavant's 6-point rule, weights scaled by the reference area
            push_orbit(&mut rule, 0.445_948_490_915_964_886_32, 0.5 * 0.223_381_589_678_011_465_70);
            push_orbit(&mut rule, 0.091_576_213_509_770_743_46, 0.5 * 0.109_951_743_655_321_867_64);
        }
        _ => return Err(Error::NoRuleAvailable),
    }
    Ok(rule)
}
