use condensa::cook::{solve_cook_membrane, CookMembraneConfig, TIP_POINT};
use condensa::parameters::Parameters;
use condensa::sparse::frobenius_norm;
use eyre::{eyre, WrapErr};
use std::env;

/// Solves Cook's membrane with the condensed mixed formulation.
///
/// Usage: `cook_membrane [parameters.json]`. Without a parameter file the default configuration is
/// used, and the default parameters are printed so that they can serve as a template.
fn main() -> eyre::Result<()> {
    let config = match env::args().nth(1) {
        Some(path) => {
            let parameters =
                Parameters::load_json(&path).wrap_err_with(|| format!("failed to load parameters from {}", path))?;
            CookMembraneConfig::from_parameters(&parameters)?
        }
        None => {
            let config = CookMembraneConfig::default();
            println!("{}", config.to_parameters().to_json_string()?);
            config
        }
    };

    let solution = solve_cook_membrane(&config)?;
    let tip = solution
        .tip_displacement()
        .ok_or_else(|| eyre!("Tip point lies outside the mesh"))?;

    println!("CG iterations: {}", solution.cg_iterations);
    println!(
        "Vertical displacement at ({}, {}): {:.6} (reference value 23.95)",
        TIP_POINT[0], TIP_POINT[1], tip.y
    );
    println!(
        "|| A - A_cond ||_F = {:.3e} (|| A ||_F = {:.3e})",
        solution.matrix_difference_norm(),
        frobenius_norm(&solution.displacement_matrix)
    );

    Ok(())
}
