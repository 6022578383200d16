pub mod kitchen_service {
    tonic::include_proto!("mise.pos.kitchen_service");
}

pub mod order_service {
    tonic::include_proto!("mise.pos.order_service");
}

pub mod catalog_service {
    tonic::include_proto!("mise.pos.catalog_service");
}
