use log::trace;

use crate::config::ContextConfigExt;
use crate::context::Context;
use crate::error::EpisimError;
use crate::population::{ContainerId, ContainerKind, ContextPopulationExt, DiseaseStatus, PersonId};
use crate::random::{ContextRandomExt, EpisimRng};
use crate::relevance::{activity_at_cursor, ContextRelevanceExt};
use crate::simulation::ContextSimulationExt;
use crate::transmission::{
    contact_intensity, contacts_to_sample, infection_probability, infection_type,
    is_excluded_cross_activity, joint_time_in_container, persons_can_infect_each_other,
    ContextTransmissionExt, TransmissionStrategy,
};

/// Samples a bounded number of co-present persons per leave and tests each pair once.
///
/// Draw order per leave: relevance of the leaving person, then per sampled candidate the
/// candidate index, the candidate's relevance, the tracing draw (leisure only) and the
/// transmission draw. Changing this order changes every downstream outcome.
///
/// If the leaving person is the one who gets infected, sampling stops for this leave and the
/// remaining candidates are never drawn, so tracing misses them.
pub struct DefaultTransmission;

impl TransmissionStrategy for DefaultTransmission {
    fn infection_dynamics(
        &self,
        context: &mut Context,
        leaving: PersonId,
        container: ContainerId,
        now: f64,
    ) -> Result<(), EpisimError> {
        if context.get_iteration() == 0 {
            return Ok(());
        }
        if !context.person_is_relevant(leaving, container)? {
            return Ok(());
        }

        let config = context.get_episim_config()?;
        let tracing = config.tracing;
        let calibration_parameter = config.calibration_parameter;
        let sample_size = config.sample_size;

        let shared = context.get_container(container)?;
        let kind = shared.kind();
        let mut candidates: Vec<PersonId> =
            shared.members().filter(|person| *person != leaving).collect();
        let contact_with = contacts_to_sample(candidates.len(), sample_size);

        for _ in 0..contact_with {
            let index = context.sample_range(EpisimRng, 0..candidates.len());
            let contact = candidates.remove(index);

            if !context.person_is_relevant(contact, container)? {
                continue;
            }

            let leaving_status = context.get_person(leaving)?.disease_status();
            let contact_status = context.get_person(contact)?.disease_status();
            // Without tracing nothing below matters for these pairs.
            if !tracing
                && (leaving_status == DiseaseStatus::InfectedButNotContagious
                    || contact_status == DiseaseStatus::InfectedButNotContagious
                    || leaving_status == contact_status)
            {
                continue;
            }

            let leaving_activity = activity_at_cursor(context.get_person(leaving)?)?.to_string();
            let contact_activity = activity_at_cursor(context.get_person(contact)?)?.to_string();
            let infection_type = infection_type(kind, &leaving_activity, &contact_activity);

            if kind == ContainerKind::Facility {
                if is_excluded_cross_activity(&infection_type, &leaving_activity, &contact_activity)
                {
                    continue;
                }
                if tracing {
                    track_contact_person(context, leaving, contact, &leaving_activity)?;
                }
            }

            if !persons_can_infect_each_other(leaving_status, contact_status) {
                continue;
            }

            let shared = context.get_container(container)?;
            let joint_time = joint_time_in_container(
                now,
                shared.entering_time(leaving),
                shared.entering_time(contact),
            )
            .map_err(|error| match error {
                EpisimError::InvariantViolation(msg) => EpisimError::InvariantViolation(format!(
                    "{msg}; leaving person {}, contact person {}, container {}",
                    context.get_person(leaving).map_or("?", |p| p.name()),
                    context.get_person(contact).map_or("?", |p| p.name()),
                    shared.name()
                )),
                other => other,
            })?;
            let intensity = contact_intensity(
                context.get_episim_config()?,
                shared,
                &leaving_activity,
                &contact_activity,
            )?;
            let probability = infection_probability(calibration_parameter, intensity, joint_time);
            trace!(
                "contact {leaving}-{contact} in {}: joint time {joint_time}, p={probability}",
                shared.name()
            );

            if context.sample_uniform(EpisimRng) < probability {
                if leaving_status == DiseaseStatus::Susceptible {
                    context.infect_person(leaving, contact, now, &infection_type)?;
                    return Ok(());
                }
                context.infect_person(contact, leaving, now, &infection_type)?;
            }
        }
        Ok(())
    }
}

/// Remembers the pair for contact tracing: always at home and work, with probability 0.8 at
/// leisure, never elsewhere.
fn track_contact_person(
    context: &mut Context,
    leaving: PersonId,
    contact: PersonId,
    leaving_activity: &str,
) -> Result<(), EpisimError> {
    let traceable = leaving_activity.contains("home")
        || leaving_activity.contains("work")
        || (leaving_activity.contains("leisure") && context.sample_uniform(EpisimRng) < 0.8);
    if traceable {
        context.get_person_mut(leaving)?.add_traceable_contact(contact);
        context.get_person_mut(contact)?.add_traceable_contact(leaving);
    }
    Ok(())
}
