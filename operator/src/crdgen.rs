use common::{ContainerizedWorkload, KubernetesApplication, ManualScalerTrait};
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    for crd in [
        ContainerizedWorkload::crd(),
        ManualScalerTrait::crd(),
        KubernetesApplication::crd(),
    ] {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
