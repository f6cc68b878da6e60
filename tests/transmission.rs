#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use episim::population::ContainerKind;
    use episim::prelude::*;
    use episim::transmission::{infection_probability, joint_time_in_container};

    const DAY: f64 = 86_400.0;

    /// A context on day 1 with nothing seeded.
    fn day_one(seed: u64, config: EpisimConfig) -> Context {
        let mut context = Context::new();
        context.init_random(seed);
        context
            .init_episim(EpisimConfig {
                initial_infections: 0,
                ..config
            })
            .unwrap();
        context.reset_for_iteration(1).unwrap();
        context
    }

    /// A person whose recorded day is the single activity `activity`, with the given status.
    fn person(context: &mut Context, name: &str, activity: &str, status: DiseaseStatus) -> PersonId {
        let person = context.population_mut().get_or_create_person(name);
        let record = context.get_person_mut(person).unwrap();
        record.advance_trajectory(activity, true);
        record.reset_trajectory_position();
        record.set_disease_status(status);
        if status != DiseaseStatus::Susceptible {
            record.set_infection_date(0).unwrap();
        }
        person
    }

    fn enter(context: &mut Context, container: &str, person: PersonId, time: f64) -> episim::population::ContainerId {
        let population = context.population_mut();
        let id = population.get_or_create_container(container, ContainerKind::Facility);
        population.add_person_to_container(id, person, time).unwrap();
        id
    }

    fn status(context: &Context, person: PersonId) -> DiseaseStatus {
        context.get_person(person).unwrap().disease_status()
    }

    #[test]
    fn probability_is_one_half_after_an_hour_together() {
        let config = EpisimConfig {
            calibration_parameter: std::f64::consts::LN_2 / 3600.0,
            ..EpisimConfig::default()
        };
        let mut context = day_one(1, config.clone());
        let source = person(&mut context, "s", "home", DiseaseStatus::Contagious);
        let target = person(&mut context, "t", "home", DiseaseStatus::Susceptible);
        let home = enter(&mut context, "home_1", source, DAY);
        enter(&mut context, "home_1", target, DAY);

        let shared = context.get_container(home).unwrap();
        let joint = joint_time_in_container(
            DAY + 3600.0,
            shared.entering_time(source),
            shared.entering_time(target),
        )
        .unwrap();
        assert_approx_eq!(joint, 3600.0);
        let probability = infection_probability(config.calibration_parameter, 1.0, joint);
        assert_approx_eq!(probability, 0.5, 1e-12);

        // And the sampled outcome follows it.
        let trials = 2000;
        let mut infected = 0;
        for seed in 0..trials {
            let mut context = day_one(seed, config.clone());
            let source = person(&mut context, "s", "home", DiseaseStatus::Contagious);
            let target = person(&mut context, "t", "home", DiseaseStatus::Susceptible);
            let home = enter(&mut context, "home_1", source, DAY);
            enter(&mut context, "home_1", target, DAY);
            context.infection_dynamics(source, home, DAY + 3600.0).unwrap();
            if status(&context, target) == DiseaseStatus::InfectedButNotContagious {
                infected += 1;
            }
        }
        let share = f64::from(infected) / f64::from(u32::try_from(trials).unwrap());
        assert!((share - 0.5).abs() < 0.05, "infected share {share}");
    }

    #[test]
    fn home_never_meets_shopping() {
        let config = EpisimConfig {
            calibration_parameter: 1.0,
            ..EpisimConfig::default()
        };
        for seed in 0..20 {
            let mut context = day_one(seed, config.clone());
            let source = person(&mut context, "s", "home", DiseaseStatus::Contagious);
            let shopper = person(&mut context, "t", "shopping", DiseaseStatus::Susceptible);
            let facility = enter(&mut context, "mixed_1", source, DAY);
            enter(&mut context, "mixed_1", shopper, DAY);
            context
                .infection_dynamics(source, facility, DAY + 7200.0)
                .unwrap();
            assert_eq!(status(&context, shopper), DiseaseStatus::Susceptible);
        }

        // The same pair at home always transmits at this calibration.
        let mut context = day_one(0, config);
        let source = person(&mut context, "s", "home", DiseaseStatus::Contagious);
        let target = person(&mut context, "t", "home", DiseaseStatus::Susceptible);
        let facility = enter(&mut context, "mixed_1", source, DAY);
        enter(&mut context, "mixed_1", target, DAY);
        context
            .infection_dynamics(source, facility, DAY + 7200.0)
            .unwrap();
        assert_eq!(status(&context, target), DiseaseStatus::InfectedButNotContagious);
        let event = &context.get_infection_events()[0];
        assert_eq!(event.infection_type, "home_home");
        assert_eq!(event.infector, "s");
        assert_eq!(event.day, 1);
    }

    #[test]
    fn samples_a_bounded_number_of_contacts() {
        for (sample_size, expected) in [(0.25, 3), (1.0, 10)] {
            let config = EpisimConfig {
                sample_size,
                ..EpisimConfig::default()
            };
            let mut context = day_one(3, config);
            let leaving = person(&mut context, "leaving", "work", DiseaseStatus::Contagious);
            let office = enter(&mut context, "work_1", leaving, DAY);
            for i in 0..50 {
                // Recovered persons are rejected without drawing, so only the
                // candidate picks consume random numbers.
                let other = person(&mut context, &format!("p{i}"), "work", DiseaseStatus::Recovered);
                enter(&mut context, "work_1", other, DAY);
            }
            let before = context.random_draw_count();
            context.infection_dynamics(leaving, office, DAY + 100.0).unwrap();
            assert_eq!(context.random_draw_count() - before, expected);
        }
    }

    #[test]
    fn dwell_time_beyond_a_day_is_fatal() {
        let mut context = day_one(5, EpisimConfig::default());
        let source = person(&mut context, "s", "home", DiseaseStatus::Contagious);
        let target = person(&mut context, "t", "home", DiseaseStatus::Susceptible);
        let home = enter(&mut context, "home_1", source, 0.0);
        enter(&mut context, "home_1", target, 0.0);

        let result = context.infection_dynamics(source, home, 2.0 * DAY + 1.0);
        assert!(matches!(result, Err(EpisimError::InvariantViolation(_))));
        assert_eq!(status(&context, target), DiseaseStatus::Susceptible);
    }

    #[test]
    fn infected_leaver_stops_sampling() {
        let config = EpisimConfig {
            calibration_parameter: 1.0,
            ..EpisimConfig::default()
        };
        let mut context = day_one(11, config);
        let leaving = person(&mut context, "leaving", "home", DiseaseStatus::Susceptible);
        let home = enter(&mut context, "home_1", leaving, DAY);
        for name in ["a", "b"] {
            let other = person(&mut context, name, "home", DiseaseStatus::Contagious);
            enter(&mut context, "home_1", other, DAY);
        }

        let before = context.random_draw_count();
        context.infection_dynamics(leaving, home, DAY + 600.0).unwrap();
        assert_eq!(status(&context, leaving), DiseaseStatus::InfectedButNotContagious);
        // One candidate pick and one transmission draw; the second candidate is never drawn.
        assert_eq!(context.random_draw_count() - before, 2);
        assert_eq!(context.get_infection_events().len(), 1);
    }

    #[test]
    fn day_zero_never_transmits() {
        let config = EpisimConfig {
            calibration_parameter: 1.0,
            initial_infections: 0,
            ..EpisimConfig::default()
        };
        let mut context = Context::new();
        context.init_random(2);
        context.init_episim(config).unwrap();
        let source = person(&mut context, "s", "home", DiseaseStatus::Contagious);
        let target = person(&mut context, "t", "home", DiseaseStatus::Susceptible);
        let home = enter(&mut context, "home_1", source, 0.0);
        enter(&mut context, "home_1", target, 0.0);

        context.infection_dynamics(source, home, 3600.0).unwrap();
        assert_eq!(status(&context, target), DiseaseStatus::Susceptible);
        assert_eq!(context.random_draw_count(), 0);
    }
}
