pub mod clients;

use tera::Tera;

/// Templates are compiled into the binary so the server has no runtime
/// dependency on its working directory.
const TEMPLATES: &[(&str, &str)] = &[(
    "emails/verify.txt",
    include_str!("../../templates/emails/verify.txt"),
)];

/// Build the templating engine used to compose outgoing email.
pub fn templates() -> anyhow::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;

    Ok(tera)
}
