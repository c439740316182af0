mod artifact;
mod metadata;
mod resolver;

pub use artifact::{ArtifactIdentity, ResolvedVersion, SnapshotDescriptor};
pub use metadata::{parse_checksum, MavenMetadata};
pub use resolver::{select_version, RepositoryResolver};

pub(crate) use resolver::for_target;

/// Repository hosting both the client and the loader.
pub const LAMBDA_MAVEN: &str = "https://maven.lambda-client.org";

/// Maven path of the client payload.
pub const CLIENT_ARTIFACT_PATH: &str = "com/lambda/lambda";
pub const CLIENT_ARTIFACT_NAME: &str = "lambda";

/// Maven path of the loader's own distributable.
pub const LOADER_ARTIFACT_PATH: &str = "com/lambda/loader";
pub const LOADER_ARTIFACT_NAME: &str = "loader";
