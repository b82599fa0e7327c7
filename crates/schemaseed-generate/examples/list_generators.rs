use schemaseed_generate::GeneratorRegistry;

fn main() {
    let registry = GeneratorRegistry::with_builtins();
    for id in registry.ids() {
        println!("{id}");
    }
}
