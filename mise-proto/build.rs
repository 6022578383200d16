fn main() {
    tonic_build::configure()
        .compile_protos(
            &[
                "proto/kitchens.proto",
                "proto/orders.proto",
                "proto/catalog.proto",
            ],
            &["proto"],
        )
        .unwrap_or_else(|e| panic!("Failed to compile protos {:?}", e));
}
