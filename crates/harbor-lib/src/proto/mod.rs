//! Protocol types for `harbor.v1.AgentService`
//!
//! The checked-in definitions mirror `proto/harbor/v1/agent.proto`. With the
//! `proto-gen` feature the same module is produced by tonic-build instead.

#[cfg(feature = "proto-gen")]
pub mod harbor {
    pub mod v1 {
        tonic::include_proto!("harbor.v1");
    }
}

#[cfg(not(feature = "proto-gen"))]
pub mod harbor {
    pub mod v1 {
        use prost::Message;
        use std::collections::HashMap;

        #[derive(Clone, PartialEq, Message)]
        pub struct Container {
            #[prost(string, tag = "1")]
            pub id: String,
            #[prost(string, tag = "2")]
            pub name: String,
            #[prost(string, tag = "3")]
            pub image: String,
            #[prost(string, tag = "4")]
            pub image_id: String,
            #[prost(string, tag = "5")]
            pub command: String,
            #[prost(message, optional, tag = "6")]
            pub created: Option<prost_types::Timestamp>,
            #[prost(string, tag = "7")]
            pub state: String,
            #[prost(string, tag = "8")]
            pub health: String,
            #[prost(string, tag = "9")]
            pub host: String,
            #[prost(bool, tag = "10")]
            pub tty: bool,
            #[prost(map = "string, string", tag = "11")]
            pub labels: HashMap<String, String>,
            #[prost(message, repeated, tag = "12")]
            pub stats: Vec<ContainerStat>,
            #[prost(string, tag = "13")]
            pub group: String,
            #[prost(message, optional, tag = "14")]
            pub started: Option<prost_types::Timestamp>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerStat {
            #[prost(string, tag = "1")]
            pub id: String,
            #[prost(double, tag = "2")]
            pub cpu_percent: f64,
            #[prost(double, tag = "3")]
            pub memory_percent: f64,
            #[prost(double, tag = "4")]
            pub memory_usage: f64,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerEvent {
            #[prost(string, tag = "1")]
            pub actor_id: String,
            #[prost(string, tag = "2")]
            pub name: String,
            #[prost(string, tag = "3")]
            pub host: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct SimpleMessage {
            #[prost(string, tag = "1")]
            pub message: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ComplexMessage {
            #[prost(bytes = "vec", tag = "1")]
            pub data: Vec<u8>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct LogEvent {
            #[prost(uint32, tag = "1")]
            pub id: u32,
            #[prost(string, tag = "2")]
            pub container_id: String,
            #[prost(oneof = "log_event::Message", tags = "3, 4")]
            pub message: Option<log_event::Message>,
            #[prost(message, optional, tag = "5")]
            pub timestamp: Option<prost_types::Timestamp>,
            #[prost(string, tag = "6")]
            pub level: String,
            #[prost(string, tag = "7")]
            pub stream: String,
            #[prost(string, tag = "8")]
            pub position: String,
        }

        pub mod log_event {
            #[derive(Clone, PartialEq, prost::Oneof)]
            pub enum Message {
                #[prost(message, tag = "3")]
                Simple(super::SimpleMessage),
                #[prost(message, tag = "4")]
                Complex(super::ComplexMessage),
            }
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct Host {
            #[prost(string, tag = "1")]
            pub id: String,
            #[prost(string, tag = "2")]
            pub name: String,
            #[prost(uint32, tag = "3")]
            pub cpu_cores: u32,
            #[prost(uint64, tag = "4")]
            pub memory: u64,
            #[prost(string, tag = "5")]
            pub runtime_version: String,
            #[prost(string, tag = "6")]
            pub agent_version: String,
        }

        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
        #[repr(i32)]
        pub enum ContainerAction {
            Unspecified = 0,
            Start = 1,
            Stop = 2,
            Restart = 3,
        }

        impl ContainerAction {
            pub fn as_str_name(&self) -> &'static str {
                match self {
                    ContainerAction::Unspecified => "CONTAINER_ACTION_UNSPECIFIED",
                    ContainerAction::Start => "CONTAINER_ACTION_START",
                    ContainerAction::Stop => "CONTAINER_ACTION_STOP",
                    ContainerAction::Restart => "CONTAINER_ACTION_RESTART",
                }
            }
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamLogsRequest {
            #[prost(string, tag = "1")]
            pub container_id: String,
            #[prost(message, optional, tag = "2")]
            pub since: Option<prost_types::Timestamp>,
            #[prost(uint32, tag = "3")]
            pub stream_types: u32,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamLogsResponse {
            #[prost(message, optional, tag = "1")]
            pub event: Option<LogEvent>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct LogsBetweenDatesRequest {
            #[prost(string, tag = "1")]
            pub container_id: String,
            #[prost(message, optional, tag = "2")]
            pub since: Option<prost_types::Timestamp>,
            #[prost(message, optional, tag = "3")]
            pub until: Option<prost_types::Timestamp>,
            #[prost(uint32, tag = "4")]
            pub stream_types: u32,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamRawBytesRequest {
            #[prost(string, tag = "1")]
            pub container_id: String,
            #[prost(message, optional, tag = "2")]
            pub since: Option<prost_types::Timestamp>,
            #[prost(message, optional, tag = "3")]
            pub until: Option<prost_types::Timestamp>,
            #[prost(uint32, tag = "4")]
            pub stream_types: u32,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamRawBytesResponse {
            #[prost(bytes = "vec", tag = "1")]
            pub data: Vec<u8>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamEventsRequest {}

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamEventsResponse {
            #[prost(message, optional, tag = "1")]
            pub event: Option<ContainerEvent>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamStatsRequest {}

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamStatsResponse {
            #[prost(message, optional, tag = "1")]
            pub stat: Option<ContainerStat>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamContainerStartedRequest {}

        #[derive(Clone, PartialEq, Message)]
        pub struct StreamContainerStartedResponse {
            #[prost(message, optional, tag = "1")]
            pub container: Option<Container>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct FindContainerRequest {
            #[prost(string, tag = "1")]
            pub container_id: String,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct FindContainerResponse {
            #[prost(message, optional, tag = "1")]
            pub container: Option<Container>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ListContainersRequest {}

        #[derive(Clone, PartialEq, Message)]
        pub struct ListContainersResponse {
            #[prost(message, repeated, tag = "1")]
            pub containers: Vec<Container>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct HostInfoRequest {}

        #[derive(Clone, PartialEq, Message)]
        pub struct HostInfoResponse {
            #[prost(message, optional, tag = "1")]
            pub host: Option<Host>,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerActionRequest {
            #[prost(string, tag = "1")]
            pub container_id: String,
            #[prost(enumeration = "ContainerAction", tag = "2")]
            pub action: i32,
        }

        #[derive(Clone, PartialEq, Message)]
        pub struct ContainerActionResponse {}

        pub mod agent_service_client {
            use super::*;
            use tonic::codegen::*;

            #[derive(Debug, Clone)]
            pub struct AgentServiceClient<T> {
                inner: tonic::client::Grpc<T>,
            }

            impl AgentServiceClient<tonic::transport::Channel> {
                pub fn new(channel: tonic::transport::Channel) -> Self {
                    let inner = tonic::client::Grpc::new(channel);
                    Self { inner }
                }
            }

            impl<T> AgentServiceClient<T>
            where
                T: tonic::client::GrpcService<tonic::body::BoxBody>,
                T::Error: Into<StdError>,
                T::ResponseBody: Body<Data = Bytes> + Send + 'static,
                <T::ResponseBody as Body>::Error: Into<StdError> + Send,
            {
                pub fn with_origin(inner: T, origin: http::Uri) -> Self {
                    let inner = tonic::client::Grpc::with_origin(inner, origin);
                    Self { inner }
                }

                async fn ready(&mut self) -> Result<(), tonic::Status> {
                    self.inner.ready().await.map_err(|e| {
                        tonic::Status::new(
                            tonic::Code::Unknown,
                            format!("Service was not ready: {}", e.into()),
                        )
                    })
                }

                pub async fn stream_logs(
                    &mut self,
                    request: impl tonic::IntoRequest<StreamLogsRequest>,
                ) -> Result<tonic::Response<tonic::codec::Streaming<StreamLogsResponse>>, tonic::Status>
                {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/StreamLogs",
                    );
                    self.inner
                        .server_streaming(request.into_request(), path, codec)
                        .await
                }

                pub async fn logs_between_dates(
                    &mut self,
                    request: impl tonic::IntoRequest<LogsBetweenDatesRequest>,
                ) -> Result<tonic::Response<tonic::codec::Streaming<StreamLogsResponse>>, tonic::Status>
                {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/LogsBetweenDates",
                    );
                    self.inner
                        .server_streaming(request.into_request(), path, codec)
                        .await
                }

                pub async fn stream_raw_bytes(
                    &mut self,
                    request: impl tonic::IntoRequest<StreamRawBytesRequest>,
                ) -> Result<
                    tonic::Response<tonic::codec::Streaming<StreamRawBytesResponse>>,
                    tonic::Status,
                > {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/StreamRawBytes",
                    );
                    self.inner
                        .server_streaming(request.into_request(), path, codec)
                        .await
                }

                pub async fn stream_events(
                    &mut self,
                    request: impl tonic::IntoRequest<StreamEventsRequest>,
                ) -> Result<
                    tonic::Response<tonic::codec::Streaming<StreamEventsResponse>>,
                    tonic::Status,
                > {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/StreamEvents",
                    );
                    self.inner
                        .server_streaming(request.into_request(), path, codec)
                        .await
                }

                pub async fn stream_stats(
                    &mut self,
                    request: impl tonic::IntoRequest<StreamStatsRequest>,
                ) -> Result<tonic::Response<tonic::codec::Streaming<StreamStatsResponse>>, tonic::Status>
                {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/StreamStats",
                    );
                    self.inner
                        .server_streaming(request.into_request(), path, codec)
                        .await
                }

                pub async fn stream_container_started(
                    &mut self,
                    request: impl tonic::IntoRequest<StreamContainerStartedRequest>,
                ) -> Result<
                    tonic::Response<tonic::codec::Streaming<StreamContainerStartedResponse>>,
                    tonic::Status,
                > {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/StreamContainerStarted",
                    );
                    self.inner
                        .server_streaming(request.into_request(), path, codec)
                        .await
                }

                pub async fn find_container(
                    &mut self,
                    request: impl tonic::IntoRequest<FindContainerRequest>,
                ) -> Result<tonic::Response<FindContainerResponse>, tonic::Status> {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/FindContainer",
                    );
                    self.inner.unary(request.into_request(), path, codec).await
                }

                pub async fn list_containers(
                    &mut self,
                    request: impl tonic::IntoRequest<ListContainersRequest>,
                ) -> Result<tonic::Response<ListContainersResponse>, tonic::Status> {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/ListContainers",
                    );
                    self.inner.unary(request.into_request(), path, codec).await
                }

                pub async fn host_info(
                    &mut self,
                    request: impl tonic::IntoRequest<HostInfoRequest>,
                ) -> Result<tonic::Response<HostInfoResponse>, tonic::Status> {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path =
                        http::uri::PathAndQuery::from_static("/harbor.v1.AgentService/HostInfo");
                    self.inner.unary(request.into_request(), path, codec).await
                }

                pub async fn container_action(
                    &mut self,
                    request: impl tonic::IntoRequest<ContainerActionRequest>,
                ) -> Result<tonic::Response<ContainerActionResponse>, tonic::Status> {
                    self.ready().await?;
                    let codec = tonic::codec::ProstCodec::default();
                    let path = http::uri::PathAndQuery::from_static(
                        "/harbor.v1.AgentService/ContainerAction",
                    );
                    self.inner.unary(request.into_request(), path, codec).await
                }
            }
        }

        pub mod agent_service_server {
            #![allow(unused_variables, dead_code, missing_docs, clippy::let_unit_value)]
            use tonic::codegen::*;

            /// Server-side contract of `harbor.v1.AgentService`
            #[async_trait]
            pub trait AgentService: Send + Sync + 'static {
                type StreamLogsStream: tokio_stream::Stream<
                        Item = std::result::Result<super::StreamLogsResponse, tonic::Status>,
                    > + Send
                    + 'static;
                type LogsBetweenDatesStream: tokio_stream::Stream<
                        Item = std::result::Result<super::StreamLogsResponse, tonic::Status>,
                    > + Send
                    + 'static;
                type StreamRawBytesStream: tokio_stream::Stream<
                        Item = std::result::Result<super::StreamRawBytesResponse, tonic::Status>,
                    > + Send
                    + 'static;
                type StreamEventsStream: tokio_stream::Stream<
                        Item = std::result::Result<super::StreamEventsResponse, tonic::Status>,
                    > + Send
                    + 'static;
                type StreamStatsStream: tokio_stream::Stream<
                        Item = std::result::Result<super::StreamStatsResponse, tonic::Status>,
                    > + Send
                    + 'static;
                type StreamContainerStartedStream: tokio_stream::Stream<
                        Item = std::result::Result<
                            super::StreamContainerStartedResponse,
                            tonic::Status,
                        >,
                    > + Send
                    + 'static;

                async fn stream_logs(
                    &self,
                    request: tonic::Request<super::StreamLogsRequest>,
                ) -> std::result::Result<tonic::Response<Self::StreamLogsStream>, tonic::Status>;

                async fn logs_between_dates(
                    &self,
                    request: tonic::Request<super::LogsBetweenDatesRequest>,
                ) -> std::result::Result<tonic::Response<Self::LogsBetweenDatesStream>, tonic::Status>;

                async fn stream_raw_bytes(
                    &self,
                    request: tonic::Request<super::StreamRawBytesRequest>,
                ) -> std::result::Result<tonic::Response<Self::StreamRawBytesStream>, tonic::Status>;

                async fn stream_events(
                    &self,
                    request: tonic::Request<super::StreamEventsRequest>,
                ) -> std::result::Result<tonic::Response<Self::StreamEventsStream>, tonic::Status>;

                async fn stream_stats(
                    &self,
                    request: tonic::Request<super::StreamStatsRequest>,
                ) -> std::result::Result<tonic::Response<Self::StreamStatsStream>, tonic::Status>;

                async fn stream_container_started(
                    &self,
                    request: tonic::Request<super::StreamContainerStartedRequest>,
                ) -> std::result::Result<
                    tonic::Response<Self::StreamContainerStartedStream>,
                    tonic::Status,
                >;

                async fn find_container(
                    &self,
                    request: tonic::Request<super::FindContainerRequest>,
                ) -> std::result::Result<tonic::Response<super::FindContainerResponse>, tonic::Status>;

                async fn list_containers(
                    &self,
                    request: tonic::Request<super::ListContainersRequest>,
                ) -> std::result::Result<tonic::Response<super::ListContainersResponse>, tonic::Status>;

                async fn host_info(
                    &self,
                    request: tonic::Request<super::HostInfoRequest>,
                ) -> std::result::Result<tonic::Response<super::HostInfoResponse>, tonic::Status>;

                async fn container_action(
                    &self,
                    request: tonic::Request<super::ContainerActionRequest>,
                ) -> std::result::Result<tonic::Response<super::ContainerActionResponse>, tonic::Status>;
            }

            #[derive(Debug)]
            pub struct AgentServiceServer<T: AgentService> {
                inner: _Inner<T>,
            }

            struct _Inner<T>(Arc<T>);

            impl<T: AgentService> AgentServiceServer<T> {
                pub fn new(inner: T) -> Self {
                    Self::from_arc(Arc::new(inner))
                }

                pub fn from_arc(inner: Arc<T>) -> Self {
                    let inner = _Inner(inner);
                    Self { inner }
                }
            }

            impl<T, B> tonic::codegen::Service<http::Request<B>> for AgentServiceServer<T>
            where
                T: AgentService,
                B: Body + Send + 'static,
                B::Error: Into<StdError> + Send + 'static,
            {
                type Response = http::Response<tonic::body::BoxBody>;
                type Error = std::convert::Infallible;
                type Future = BoxFuture<Self::Response, Self::Error>;

                fn poll_ready(
                    &mut self,
                    _cx: &mut Context<'_>,
                ) -> Poll<std::result::Result<(), Self::Error>> {
                    Poll::Ready(Ok(()))
                }

                fn call(&mut self, req: http::Request<B>) -> Self::Future {
                    let inner = self.inner.clone();
                    match req.uri().path() {
                        "/harbor.v1.AgentService/StreamLogs" => {
                            #[allow(non_camel_case_types)]
                            struct StreamLogsSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::ServerStreamingService<super::StreamLogsRequest>
                                for StreamLogsSvc<T>
                            {
                                type Response = super::StreamLogsResponse;
                                type ResponseStream = T::StreamLogsStream;
                                type Future =
                                    BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::StreamLogsRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut = async move { (*inner).stream_logs(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = StreamLogsSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.server_streaming(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/LogsBetweenDates" => {
                            #[allow(non_camel_case_types)]
                            struct LogsBetweenDatesSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::ServerStreamingService<super::LogsBetweenDatesRequest>
                                for LogsBetweenDatesSvc<T>
                            {
                                type Response = super::StreamLogsResponse;
                                type ResponseStream = T::LogsBetweenDatesStream;
                                type Future =
                                    BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::LogsBetweenDatesRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut =
                                        async move { (*inner).logs_between_dates(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = LogsBetweenDatesSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.server_streaming(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/StreamRawBytes" => {
                            #[allow(non_camel_case_types)]
                            struct StreamRawBytesSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::ServerStreamingService<super::StreamRawBytesRequest>
                                for StreamRawBytesSvc<T>
                            {
                                type Response = super::StreamRawBytesResponse;
                                type ResponseStream = T::StreamRawBytesStream;
                                type Future =
                                    BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::StreamRawBytesRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut =
                                        async move { (*inner).stream_raw_bytes(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = StreamRawBytesSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.server_streaming(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/StreamEvents" => {
                            #[allow(non_camel_case_types)]
                            struct StreamEventsSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::ServerStreamingService<super::StreamEventsRequest>
                                for StreamEventsSvc<T>
                            {
                                type Response = super::StreamEventsResponse;
                                type ResponseStream = T::StreamEventsStream;
                                type Future =
                                    BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::StreamEventsRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut = async move { (*inner).stream_events(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = StreamEventsSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.server_streaming(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/StreamStats" => {
                            #[allow(non_camel_case_types)]
                            struct StreamStatsSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::ServerStreamingService<super::StreamStatsRequest>
                                for StreamStatsSvc<T>
                            {
                                type Response = super::StreamStatsResponse;
                                type ResponseStream = T::StreamStatsStream;
                                type Future =
                                    BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::StreamStatsRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut = async move { (*inner).stream_stats(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = StreamStatsSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.server_streaming(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/StreamContainerStarted" => {
                            #[allow(non_camel_case_types)]
                            struct StreamContainerStartedSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::ServerStreamingService<
                                    super::StreamContainerStartedRequest,
                                > for StreamContainerStartedSvc<T>
                            {
                                type Response = super::StreamContainerStartedResponse;
                                type ResponseStream = T::StreamContainerStartedStream;
                                type Future =
                                    BoxFuture<tonic::Response<Self::ResponseStream>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::StreamContainerStartedRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut = async move {
                                        (*inner).stream_container_started(request).await
                                    };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = StreamContainerStartedSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.server_streaming(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/FindContainer" => {
                            #[allow(non_camel_case_types)]
                            struct FindContainerSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::UnaryService<super::FindContainerRequest>
                                for FindContainerSvc<T>
                            {
                                type Response = super::FindContainerResponse;
                                type Future =
                                    BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::FindContainerRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut = async move { (*inner).find_container(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = FindContainerSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.unary(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/ListContainers" => {
                            #[allow(non_camel_case_types)]
                            struct ListContainersSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::UnaryService<super::ListContainersRequest>
                                for ListContainersSvc<T>
                            {
                                type Response = super::ListContainersResponse;
                                type Future =
                                    BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::ListContainersRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut =
                                        async move { (*inner).list_containers(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = ListContainersSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.unary(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/HostInfo" => {
                            #[allow(non_camel_case_types)]
                            struct HostInfoSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService> tonic::server::UnaryService<super::HostInfoRequest>
                                for HostInfoSvc<T>
                            {
                                type Response = super::HostInfoResponse;
                                type Future =
                                    BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::HostInfoRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut = async move { (*inner).host_info(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = HostInfoSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.unary(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        "/harbor.v1.AgentService/ContainerAction" => {
                            #[allow(non_camel_case_types)]
                            struct ContainerActionSvc<T: AgentService>(pub Arc<T>);
                            impl<T: AgentService>
                                tonic::server::UnaryService<super::ContainerActionRequest>
                                for ContainerActionSvc<T>
                            {
                                type Response = super::ContainerActionResponse;
                                type Future =
                                    BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                                fn call(
                                    &mut self,
                                    request: tonic::Request<super::ContainerActionRequest>,
                                ) -> Self::Future {
                                    let inner = Arc::clone(&self.0);
                                    let fut =
                                        async move { (*inner).container_action(request).await };
                                    Box::pin(fut)
                                }
                            }
                            let fut = async move {
                                let inner = inner.0;
                                let method = ContainerActionSvc(inner);
                                let codec = tonic::codec::ProstCodec::default();
                                let mut grpc = tonic::server::Grpc::new(codec);
                                let res = grpc.unary(method, req).await;
                                Ok(res)
                            };
                            Box::pin(fut)
                        }
                        _ => Box::pin(async move {
                            Ok(http::Response::builder()
                                .status(200)
                                .header("grpc-status", "12")
                                .header("content-type", "application/grpc")
                                .body(empty_body())
                                .unwrap())
                        }),
                    }
                }
            }

            impl<T: AgentService> Clone for AgentServiceServer<T> {
                fn clone(&self) -> Self {
                    let inner = self.inner.clone();
                    Self { inner }
                }
            }

            impl<T: AgentService> Clone for _Inner<T> {
                fn clone(&self) -> Self {
                    Self(Arc::clone(&self.0))
                }
            }

            impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{:?}", self.0)
                }
            }

            impl<T: AgentService> tonic::server::NamedService for AgentServiceServer<T> {
                const NAME: &'static str = "harbor.v1.AgentService";
            }
        }
    }
}

pub use harbor::v1::agent_service_client::AgentServiceClient;
pub use harbor::v1::agent_service_server::{AgentService, AgentServiceServer};
pub use harbor::v1::*;
