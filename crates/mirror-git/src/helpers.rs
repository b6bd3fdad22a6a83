//! Shared git2 helper functions
//!
//! Credential negotiation and branch pushing used by [`crate::WorkingCopy`].

use git2::{Cred, CredentialType, ErrorCode, PushOptions, RemoteCallbacks, Repository};

use crate::{Error, Result};

/// Maximum credential attempts before giving up on a remote.
///
/// libgit2 re-invokes the callback after every rejected credential.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Build remote callbacks that resolve credentials the way the git CLI does.
///
/// Credentials embedded in an https URL are applied by libgit2 itself; this
/// covers credential helpers, the ssh agent and default (negotiate) auth.
pub fn remote_callbacks<'a>(config: git2::Config) -> RemoteCallbacks<'a> {
    let mut attempts = 0usize;
    let mut callbacks = RemoteCallbacks::new();

    callbacks.credentials(move |url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str(&format!(
                "authentication failed for {url}"
            )));
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            let user = username_from_url.unwrap_or("git");
            return Cred::ssh_key_from_agent(user);
        }
        if allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
            && let Ok(cred) = Cred::credential_helper(&config, url, username_from_url)
        {
            return Ok(cred);
        }
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username_from_url.unwrap_or("git"));
        }
        Cred::default()
    });

    callbacks
}

/// Get the current branch name from a repository.
///
/// Returns the branch name if HEAD points to a branch, or `None` if HEAD is
/// detached. An unborn branch (fresh clone of an empty remote) reports the
/// name HEAD will point to once the first commit lands.
pub fn get_current_branch(repo: &Repository) -> Result<Option<String>> {
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(Some(head.shorthand().unwrap_or("HEAD").to_string())),
        Ok(_) => Ok(None),
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD")?;
            Ok(head
                .symbolic_target()
                .and_then(|target| target.strip_prefix("refs/heads/"))
                .map(str::to_string))
        }
        Err(e) => Err(e.into()),
    }
}

/// Push a branch to a remote, surfacing per-reference rejections.
///
/// A transport failure becomes [`Error::PushFailed`]; a reference the remote
/// refused (non-fast-forward, hook rejection) becomes [`Error::PushRejected`].
pub fn push_branch(repo: &Repository, remote_name: &str, branch: &str) -> Result<()> {
    let mut remote = repo
        .find_remote(remote_name)
        .map_err(|_| Error::RemoteNotFound {
            name: remote_name.to_string(),
        })?;

    let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
    let mut rejected: Vec<(String, String)> = Vec::new();

    {
        let mut callbacks = remote_callbacks(repo.config()?);
        callbacks.push_update_reference(|reference, status| {
            if let Some(message) = status {
                rejected.push((reference.to_string(), message.to_string()));
            }
            Ok(())
        });

        let mut opts = PushOptions::new();
        opts.remote_callbacks(callbacks);

        remote
            .push(&[refspec.as_str()], Some(&mut opts))
            .map_err(|e| Error::PushFailed {
                message: e.message().to_string(),
            })?;
    }

    if let Some((reference, message)) = rejected.into_iter().next() {
        return Err(Error::PushRejected { reference, message });
    }

    tracing::debug!(remote = %remote_name, branch = %branch, "Pushed branch");
    Ok(())
}
