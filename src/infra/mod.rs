pub mod sqs_client;
