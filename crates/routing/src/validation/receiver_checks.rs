//! Per-receiver checks and inheritance of global defaults.

use crate::error::{ConfigError, Result};
use crate::schema::{GlobalConfig, Receiver};

fn missing(what: &str) -> ConfigError {
    ConfigError::validation(what.to_string())
}

/// Fill unset integration fields of `receiver` from `global` and check each
/// integration has what it needs to deliver.
pub fn resolve_receiver(receiver: &mut Receiver, global: &GlobalConfig) -> Result<()> {
    receiver.for_each_http_integration(|c| {
        let http = c.http_config_mut();
        if http.is_none() {
            *http = global.http_config.clone();
        }
    });

    for wh in &receiver.webhook_configs {
        if wh.url.is_none() {
            return Err(missing("one of url or url_file must be configured in webhook config"));
        }
        if let Some(http) = &wh.http_config {
            http.validate().map_err(ConfigError::Validation)?;
        }
    }

    for ec in &mut receiver.email_configs {
        if ec.to.is_empty() {
            return Err(missing("missing to address in email config"));
        }
        if ec.smarthost.is_empty() {
            if global.smtp_smarthost.is_empty() {
                return Err(missing("no global SMTP smarthost set"));
            }
            ec.smarthost = global.smtp_smarthost.clone();
        }
        if ec.from.is_empty() {
            if global.smtp_from.is_empty() {
                return Err(missing("no global SMTP from set"));
            }
            ec.from = global.smtp_from.clone();
        }
        if ec.hello.is_empty() {
            ec.hello = global.smtp_hello.clone();
        }
        if ec.auth_username.is_empty() {
            ec.auth_username = global.smtp_auth_username.clone();
        }
        if ec.auth_password.is_empty() {
            ec.auth_password = global.smtp_auth_password.clone();
        }
        if ec.auth_secret.is_empty() {
            ec.auth_secret = global.smtp_auth_secret.clone();
        }
        if ec.auth_identity.is_empty() {
            ec.auth_identity = global.smtp_auth_identity.clone();
        }
        if ec.require_tls.is_none() {
            ec.require_tls = Some(global.smtp_require_tls);
        }
        // Header names are case-insensitive; two spellings of one header is ambiguous.
        let mut seen = std::collections::BTreeSet::new();
        for name in ec.headers.keys() {
            if !seen.insert(name.to_lowercase()) {
                return Err(ConfigError::validation(format!(
                    "duplicate header {name:?} in email config"
                )));
            }
        }
    }

    for sc in &mut receiver.slack_configs {
        if sc.api_url.is_some() && !sc.api_url_file.is_empty() {
            return Err(missing("at most one of api_url & api_url_file must be configured"));
        }
        if sc.api_url.is_none() && sc.api_url_file.is_empty() {
            if global.slack_api_url.is_none() && global.slack_api_url_file.is_empty() {
                return Err(missing("no global Slack API URL set either inline or in a file"));
            }
            sc.api_url = global.slack_api_url.clone();
            sc.api_url_file = global.slack_api_url_file.clone();
        }
    }

    for pd in &mut receiver.pagerduty_configs {
        if pd.url.is_none() {
            pd.url = Some(global.pagerduty_url.clone().ok_or_else(|| missing("no global PagerDuty URL set"))?);
        }
        if pd.routing_key.is_empty() && pd.service_key.is_empty() {
            return Err(missing("missing service or routing key in PagerDuty config"));
        }
    }

    for og in &mut receiver.opsgenie_configs {
        if !og.api_key.is_empty() && !og.api_key_file.is_empty() {
            return Err(missing("at most one of api_key & api_key_file must be configured"));
        }
        let mut url = match og.api_url.take() {
            Some(url) => url,
            None => global.opsgenie_api_url.clone().ok_or_else(|| missing("no global OpsGenie URL set"))?,
        };
        url.ensure_trailing_slash();
        og.api_url = Some(url);
        if og.api_key.is_empty() && og.api_key_file.is_empty() {
            if global.opsgenie_api_key.is_empty() && global.opsgenie_api_key_file.is_empty() {
                return Err(missing("no global OpsGenie API Key set either inline or in a file"));
            }
            og.api_key = global.opsgenie_api_key.clone();
            og.api_key_file = global.opsgenie_api_key_file.clone();
        }
    }

    for wc in &mut receiver.wechat_configs {
        let mut url = match wc.api_url.take() {
            Some(url) => url,
            None => global.wechat_api_url.clone().ok_or_else(|| missing("no global Wechat URL set"))?,
        };
        url.ensure_trailing_slash();
        wc.api_url = Some(url);
        if wc.api_secret.is_empty() {
            if global.wechat_api_secret.is_empty() {
                return Err(missing("no global Wechat ApiSecret set"));
            }
            wc.api_secret = global.wechat_api_secret.clone();
        }
        if wc.corp_id.is_empty() {
            if global.wechat_api_corp_id.is_empty() {
                return Err(missing("no global Wechat CorpID set"));
            }
            wc.corp_id = global.wechat_api_corp_id.clone();
        }
    }

    for vo in &mut receiver.victorops_configs {
        let mut url = match vo.api_url.take() {
            Some(url) => url,
            None => global.victorops_api_url.clone().ok_or_else(|| missing("no global VictorOps URL set"))?,
        };
        url.ensure_trailing_slash();
        vo.api_url = Some(url);
        if vo.api_key.is_empty() {
            if global.victorops_api_key.is_empty() {
                return Err(missing("no global VictorOps API Key set"));
            }
            vo.api_key = global.victorops_api_key.clone();
        }
        if vo.routing_key.is_empty() {
            return Err(missing("missing routing key in VictorOps config"));
        }
    }

    for po in &receiver.pushover_configs {
        if po.user_key.is_empty() {
            return Err(missing("missing user key in Pushover config"));
        }
        if po.token.is_empty() {
            return Err(missing("missing token in Pushover config"));
        }
    }

    for sns in &receiver.sns_configs {
        let targets = [&sns.topic_arn, &sns.phone_number, &sns.target_arn];
        if targets.iter().filter(|t| !t.is_empty()).count() != 1 {
            return Err(missing("must provide exactly one of topic_arn, phone_number or target_arn in SNS config"));
        }
    }

    for mt in &receiver.msteams_configs {
        if mt.webhook_url.is_none() {
            return Err(missing("no msteams webhook URL provided"));
        }
    }

    Ok(())
}
