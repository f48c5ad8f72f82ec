//! Prints the CRD manifests for `kubectl apply -f -`.

use crds::{Build, Route};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&Build::crd())?);
    println!("---");
    print!("{}", serde_yaml::to_string(&Route::crd())?);
    Ok(())
}
