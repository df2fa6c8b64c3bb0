use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::NewJob;

/// Payload type bound to a job type name.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendEmail { to: String }
///
/// impl JobArgs for SendEmail {
///     const TYPE: &'static str = "email.send";
/// }
/// ```
pub trait JobArgs: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    /// Build an enqueue request carrying these args.
    fn to_new_job(&self) -> Result<NewJob, serde_json::Error> {
        Ok(NewJob::new(Self::TYPE, serde_json::to_value(self)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct Resize {
        width: u32,
    }

    impl JobArgs for Resize {
        const TYPE: &'static str = "image.resize";
    }

    #[test]
    fn to_new_job_uses_type_and_args() {
        let new_job = Resize { width: 640 }.to_new_job().unwrap();
        assert_eq!(new_job.job_type, "image.resize");
        assert_eq!(new_job.args, json!({ "width": 640 }));
    }
}
