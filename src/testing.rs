//! In-memory fakes of the provider traits. Every call is recorded so tests
//! can assert exactly which control-plane mutations and reports happened.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use indexmap::IndexMap;

use crate::environment::{Environment, EnvironmentStatus};
use crate::error::{BlueGreenError, Result};
use crate::job::{FailureType, JobReport};
use crate::providers::{ControlPlane, JobReporter, ObjectStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListEnvironments(String),
    Describe(Vec<String>),
    Swap {
        source: String,
        destination: String,
    },
    Terminate(String),
    ListTemplates(String),
    CreateTemplate {
        environment_id: String,
        name: String,
    },
    DeleteTemplate(String),
    CreateEnvironment {
        name: String,
        template: String,
        version_label: Option<String>,
    },
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Swap { .. }
                | Self::Terminate(_)
                | Self::CreateTemplate { .. }
                | Self::DeleteTemplate(_)
                | Self::CreateEnvironment { .. }
        )
    }
}

pub fn created(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0)
        .single()
        .unwrap()
}

pub fn environment(name: &str, day: u32, status: EnvironmentStatus) -> Environment {
    Environment {
        name: name.to_string(),
        id: format!("e-{name}"),
        status,
        created_at: created(day),
        cname: Some(format!("{name}.example.com")),
        version_label: Some("v1".to_string()),
    }
}

#[derive(Default)]
pub struct FakeControlPlane {
    environments: Mutex<Vec<Environment>>,
    templates: Mutex<Vec<String>>,
    /// Statuses handed out by successive describe calls, per environment.
    scripted: Mutex<HashMap<String, VecDeque<EnvironmentStatus>>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeControlPlane {
    pub fn with_environments(environments: Vec<Environment>) -> Self {
        let fake = Self::default();
        *fake.environments.lock().unwrap() = environments;
        fake
    }

    pub fn with_templates(self, templates: &[&str]) -> Self {
        *self.templates.lock().unwrap() = templates.iter().map(|t| t.to_string()).collect();
        self
    }

    /// The environment reports these statuses on its next describe calls,
    /// then keeps the last one.
    pub fn script_statuses(&self, name: &str, statuses: Vec<EnvironmentStatus>) {
        self.scripted
            .lock()
            .unwrap()
            .insert(name.to_string(), statuses.into());
    }

    /// Makes the named operation fail with a 503 from now on.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn swaps(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Swap {
                    source,
                    destination,
                } => Some((source, destination)),
                _ => None,
            })
            .collect()
    }

    pub fn terminations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Terminate(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn describe_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Describe(_)))
            .count()
    }

    pub fn templates(&self) -> Vec<String> {
        self.templates.lock().unwrap().clone()
    }

    pub fn status_of(&self, name: &str) -> Option<EnvironmentStatus> {
        self.environments
            .lock()
            .unwrap()
            .iter()
            .find(|env| env.name == name)
            .map(|env| env.status.clone())
    }

    fn record(&self, call: Call, operation: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(operation) {
            return Err(BlueGreenError::Api {
                status: 503,
                message: format!("{operation} unavailable"),
            });
        }
        Ok(())
    }

    fn advance_script(&self, name: &str) {
        let mut scripted = self.scripted.lock().unwrap();
        let Some(queue) = scripted.get_mut(name) else {
            return;
        };
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        if let Some(status) = next {
            if let Some(env) = self
                .environments
                .lock()
                .unwrap()
                .iter_mut()
                .find(|env| env.name == name)
            {
                env.status = status;
            }
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn list_environments(&self, application: &str) -> Result<Vec<Environment>> {
        self.record(Call::ListEnvironments(application.to_string()), "list")?;
        Ok(self.environments.lock().unwrap().clone())
    }

    async fn describe_environments(&self, names: &[&str]) -> Result<Vec<Environment>> {
        self.record(
            Call::Describe(names.iter().map(|n| n.to_string()).collect()),
            "describe",
        )?;
        for name in names {
            self.advance_script(name);
        }
        // Reverse the request order so callers cannot rely on positions.
        Ok(self
            .environments
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|env| names.contains(&env.name.as_str()))
            .cloned()
            .collect())
    }

    async fn swap_environment_cnames(&self, source: &str, destination: &str) -> Result<()> {
        self.record(
            Call::Swap {
                source: source.to_string(),
                destination: destination.to_string(),
            },
            "swap",
        )?;
        let mut environments = self.environments.lock().unwrap();
        let source_cname = environments
            .iter()
            .find(|env| env.name == source)
            .and_then(|env| env.cname.clone());
        let destination_cname = environments
            .iter()
            .find(|env| env.name == destination)
            .and_then(|env| env.cname.clone());
        for env in environments.iter_mut() {
            if env.name == source {
                env.cname = destination_cname.clone();
            } else if env.name == destination {
                env.cname = source_cname.clone();
            }
        }
        Ok(())
    }

    async fn terminate_environment(&self, name: &str) -> Result<()> {
        self.record(Call::Terminate(name.to_string()), "terminate")?;
        if let Some(env) = self
            .environments
            .lock()
            .unwrap()
            .iter_mut()
            .find(|env| env.name == name)
        {
            env.status = EnvironmentStatus::Terminating;
        }
        Ok(())
    }

    async fn list_configuration_templates(&self, application: &str) -> Result<Vec<String>> {
        self.record(Call::ListTemplates(application.to_string()), "list_templates")?;
        Ok(self.templates())
    }

    async fn create_configuration_template(
        &self,
        _application: &str,
        environment_id: &str,
        name: &str,
    ) -> Result<String> {
        self.record(
            Call::CreateTemplate {
                environment_id: environment_id.to_string(),
                name: name.to_string(),
            },
            "create_template",
        )?;
        self.templates.lock().unwrap().push(name.to_string());
        Ok(name.to_string())
    }

    async fn delete_configuration_template(&self, _application: &str, name: &str) -> Result<()> {
        self.record(Call::DeleteTemplate(name.to_string()), "delete_template")?;
        self.templates.lock().unwrap().retain(|t| t != name);
        Ok(())
    }

    async fn create_environment(
        &self,
        _application: &str,
        name: &str,
        template: &str,
        version_label: Option<&str>,
    ) -> Result<Environment> {
        self.record(
            Call::CreateEnvironment {
                name: name.to_string(),
                template: template.to_string(),
                version_label: version_label.map(str::to_string),
            },
            "create_environment",
        )?;
        let mut created = environment(name, 28, EnvironmentStatus::Launching);
        created.version_label = version_label.map(str::to_string);
        let mut environments = self.environments.lock().unwrap();
        environments.retain(|env| env.name != name);
        environments.push(created.clone());
        Ok(created)
    }
}

#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    puts: Mutex<usize>,
    deletes: Mutex<usize>,
}

impl FakeObjectStore {
    pub fn with_object(self, bucket: &str, key: &str, body: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
        self
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn put_count(&self) -> usize {
        *self.puts.lock().unwrap()
    }

    pub fn delete_count(&self) -> usize {
        *self.deletes.lock().unwrap()
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self.object(bucket, key).is_some())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        *self.puts.lock().unwrap() += 1;
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.object(bucket, key)
            .ok_or_else(|| BlueGreenError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        *self.deletes.lock().unwrap() += 1;
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(String, JobReport)>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(String, JobReport)> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobReporter for RecordingReporter {
    async fn put_job_success(
        &self,
        job_id: &str,
        output_variables: &IndexMap<String, String>,
    ) -> Result<()> {
        self.reports.lock().unwrap().push((
            job_id.to_string(),
            JobReport::Success {
                output_variables: output_variables.clone(),
            },
        ));
        Ok(())
    }

    async fn put_job_failure(
        &self,
        job_id: &str,
        message: &str,
        failure_type: FailureType,
    ) -> Result<()> {
        self.reports.lock().unwrap().push((
            job_id.to_string(),
            JobReport::Failure {
                message: message.to_string(),
                failure_type,
            },
        ));
        Ok(())
    }
}
