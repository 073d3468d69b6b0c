fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // 仅在启用 rpc 特性时生成 gRPC 服务代码；消息类型为手写的 prost 派生，无需 protoc
    #[cfg(feature = "rpc")]
    {
        let submit_event = tonic_build::manual::Method::builder()
            .name("submit_event")
            .route_name("SubmitEvent")
            .input_type("crate::remote::rpc::proto::SubmitEventRequest")
            .output_type("crate::remote::rpc::proto::SubmitEventResponse")
            .codec_path("tonic::codec::ProstCodec")
            .build();

        let service = tonic_build::manual::Service::builder()
            .name("EventService")
            .package("beacon")
            .method(submit_event)
            .build();

        tonic_build::manual::Builder::new().compile(&[service]);
    }
}
