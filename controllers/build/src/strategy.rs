//! Build strategies: render the worker pod for a build.

use crate::error::ControllerError;
use crds::Build;
use k8s_openapi::api::core::v1::{Container, EnvVar, Pod, PodSpec, SecurityContext};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;

/// Name of the single container in a docker build pod
pub const BUILD_CONTAINER_NAME: &str = "docker-build";

/// Label carrying the owning build's name
pub const BUILD_LABEL: &str = "platform.microscaler.io/build";

/// Turns a build into the pod that performs it.
pub trait BuildStrategy: Send + Sync {
    /// Renders the worker pod named `pod_name`.
    ///
    /// An error means the build cannot be dispatched and goes straight to
    /// `Failed`.
    fn create_build_pod(&self, build: &Build, pod_name: &str) -> Result<Pod, ControllerError>;
}

/// Runs `docker build` (and push, when a registry is set) in a privileged
/// builder container.
#[derive(Debug, Clone)]
pub struct DockerBuildStrategy {
    default_image: String,
}

impl DockerBuildStrategy {
    /// Creates a strategy using `default_image` unless a build overrides it.
    pub fn new(default_image: impl Into<String>) -> Self {
        Self {
            default_image: default_image.into(),
        }
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

impl BuildStrategy for DockerBuildStrategy {
    fn create_build_pod(&self, build: &Build, pod_name: &str) -> Result<Pod, ControllerError> {
        let name = build.name_any();
        let spec = &build.spec;
        if spec.source.git_uri.trim().is_empty() {
            return Err(ControllerError::Strategy(format!(
                "build {} has no source URI",
                name
            )));
        }
        if spec.output.image_tag.trim().is_empty() {
            return Err(ControllerError::Strategy(format!(
                "build {} has no output image tag",
                name
            )));
        }

        let image = spec
            .strategy
            .builder_image
            .clone()
            .filter(|image| !image.trim().is_empty())
            .unwrap_or_else(|| self.default_image.clone());

        let mut env = vec![
            env_var("BUILD_TAG", &spec.output.image_tag),
            env_var("SOURCE_URI", &spec.source.git_uri),
        ];
        if let Some(git_ref) = &spec.source.git_ref {
            env.push(env_var("SOURCE_REF", git_ref));
        }
        if let Some(registry) = &spec.output.registry {
            env.push(env_var("OUTPUT_REGISTRY", registry));
        }

        Ok(Pod {
            metadata: ObjectMeta {
                name: Some(pod_name.to_string()),
                namespace: build.namespace(),
                labels: Some(BTreeMap::from([(BUILD_LABEL.to_string(), name)])),
                owner_references: build.controller_owner_ref(&()).map(|owner| vec![owner]),
                ..Default::default()
            },
            spec: Some(PodSpec {
                restart_policy: Some("Never".to_string()),
                containers: vec![Container {
                    name: BUILD_CONTAINER_NAME.to_string(),
                    image: Some(image),
                    env: Some(env),
                    security_context: Some(SecurityContext {
                        privileged: Some(true),
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_build;

    fn env_of(pod: &Pod) -> Vec<(String, String)> {
        pod.spec.as_ref().unwrap().containers[0]
            .env
            .as_ref()
            .unwrap()
            .iter()
            .map(|e| (e.name.clone(), e.value.clone().unwrap_or_default()))
            .collect()
    }

    #[test]
    fn test_renders_privileged_build_pod() {
        let strategy = DockerBuildStrategy::new("builder:1");
        let build = create_test_build("b1", "default");
        let pod = strategy.create_build_pod(&build, "build-b1").unwrap();

        assert_eq!(pod.metadata.name.as_deref(), Some("build-b1"));
        assert_eq!(pod.metadata.namespace.as_deref(), Some("default"));
        assert_eq!(
            pod.metadata.labels.as_ref().unwrap().get(BUILD_LABEL).map(String::as_str),
            Some("b1")
        );

        let spec = pod.spec.as_ref().unwrap();
        assert_eq!(spec.restart_policy.as_deref(), Some("Never"));
        assert_eq!(spec.containers.len(), 1);
        let container = &spec.containers[0];
        assert_eq!(container.name, BUILD_CONTAINER_NAME);
        assert_eq!(container.image.as_deref(), Some("builder:1"));
        assert_eq!(
            container.security_context.as_ref().and_then(|s| s.privileged),
            Some(true)
        );

        let env = env_of(&pod);
        assert!(env.contains(&("BUILD_TAG".to_string(), "app:latest".to_string())));
        assert!(env.iter().any(|(k, _)| k == "SOURCE_URI"));
        assert!(!env.iter().any(|(k, _)| k == "SOURCE_REF"), "no ref configured");
        assert!(!env.iter().any(|(k, _)| k == "OUTPUT_REGISTRY"), "no registry configured");
    }

    #[test]
    fn test_optional_fields_and_image_override() {
        let strategy = DockerBuildStrategy::new("builder:1");
        let mut build = create_test_build("b1", "default");
        build.spec.source.git_ref = Some("v1.2.0".to_string());
        build.spec.output.registry = Some("registry.local:5000".to_string());
        build.spec.strategy.builder_image = Some("builder:custom".to_string());

        let pod = strategy.create_build_pod(&build, "build-b1").unwrap();
        let env = env_of(&pod);
        assert!(env.contains(&("SOURCE_REF".to_string(), "v1.2.0".to_string())));
        assert!(env.contains(&("OUTPUT_REGISTRY".to_string(), "registry.local:5000".to_string())));
        assert_eq!(
            pod.spec.as_ref().unwrap().containers[0].image.as_deref(),
            Some("builder:custom")
        );
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let strategy = DockerBuildStrategy::new("builder:1");
        let mut build = create_test_build("b1", "default");
        build.spec.source.git_uri = String::new();
        assert!(matches!(
            strategy.create_build_pod(&build, "build-b1"),
            Err(ControllerError::Strategy(_))
        ));
    }

    #[test]
    fn test_missing_output_tag_is_an_error() {
        let strategy = DockerBuildStrategy::new("builder:1");
        let mut build = create_test_build("b1", "default");
        build.spec.output.image_tag = "  ".to_string();
        assert!(matches!(
            strategy.create_build_pod(&build, "build-b1"),
            Err(ControllerError::Strategy(_))
        ));
    }
}
