//! Provides an example of how to use ctbn to represent a Continuous-Time Bayesian Network.
//!
//! A house is either cold or warm, and its heating is either off or on. The heating reacts to
//! the temperature, which in turn follows the heating.

use ctbn as c;
use c::init::Initialization;
use ndarray::array;

fn main() -> c::Result<()> {

    ///////////////////////////////////////////////////
    // Step 1: Define variables

    let temperature = c::DiscreteVariable::new("temperature", &["cold", "warm"])?;
    let heating = c::DiscreteVariable::new("heating", &["off", "on"])?;

    ///////////////////////////////////////////////////
    // Step 2: Build the network and its conditional intensity matrices
    //
    // Note: the tables are laid out as (X#i, X#j, parent), row-major
    let model = c::CtbnBuilder::new()
        .with_variable(temperature)
        .with_variable(heating)
        .with_arc("heating", "temperature")
        .with_arc("temperature", "heating")
        .with_cim("temperature", Initialization::Values(&[0., 0., 0.1, 2., 1., 0.2, 0., 0.]))
        .with_cim("heating", Initialization::Values(&[0., 0., 0.1, 3., 4., 0.1, 0., 0.]))
        .build()?;

    for name in model.names() {
        let cim = model.cim(name)?;
        println!("{} <- {:?}", name, model.parent_names(name)?);
        println!("  dimensions: {:?}", cim.var_names());
        println!("  rates:      {:?}", cim.to_vec());
    }

    ///////////////////////////////////////////////////
    // Step 3: Amalgamate into the intensity matrix of the joint process
    let joint = model.cim("temperature")?.amalgamate(model.cim("heating")?)?;
    println!("joint intensity matrix over {:?}:", joint.bases());
    println!("{}", joint.to_matrix()?);

    ///////////////////////////////////////////////////
    // Step 4: A single intensity matrix from its square form
    let mut door = c::Cim::for_variable(&c::DiscreteVariable::new("door", &["closed", "open"])?)?;
    door.from_matrix(&array![[-0.5, 0.5], [3., -3.]])?;
    door.validate(1e-9)?;
    println!("door: {:?}", door.to_vec());

    ///////////////////////////////////////////////////
    // Step 5: Persist and reload the network
    let json = model.to_json()?;
    let reloaded = c::Ctbn::from_json(&json)?;
    assert_eq!(reloaded.to_json()?, json);
    println!("{}", json);

    Ok(())
}
