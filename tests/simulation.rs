#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use episim::population::{ContainerId, PersonId};
    use episim::transmission::{contacts_to_sample, DefaultTransmission, TransmissionStrategy};

    use episim::events::{read_events_from_reader, write_events, SECONDS_PER_DAY};
    use episim::population::ContainerKind;
    use episim::prelude::*;
    use episim::reporting::InfectionEvent;
    use episim::restrictions::Restriction;
    use episim::{EventFilter, FacilitiesHandling};

    /// Thirty commuters between ten homes and four workplaces, riding three buses.
    fn commuters() -> Vec<MobilityEvent> {
        let mut events = Vec::new();
        for i in 0..30_u32 {
            let person = format!("p{i}");
            let home = format!("home_{}", i % 10);
            let work = format!("work_{}", i % 4);
            let bus = format!("tr_{}", i % 3);
            let t = f64::from(i);
            events.extend([
                MobilityEvent::activity_end(20_000.0 + t, &person, "home", &home),
                MobilityEvent::enters_vehicle(21_000.0 + t, &person, &bus),
                MobilityEvent::leaves_vehicle(22_000.0 + t, &person, &bus),
                MobilityEvent::activity_start(22_500.0 + t, &person, "work", &work),
                MobilityEvent::activity_end(50_000.0 + t, &person, "work", &work),
                MobilityEvent::enters_vehicle(51_000.0 + t, &person, &bus),
                MobilityEvent::leaves_vehicle(52_000.0 + t, &person, &bus),
                MobilityEvent::activity_start(52_500.0 + t, &person, "home", &home),
            ]);
        }
        events.sort_by(|a, b| a.time().total_cmp(&b.time()));
        events
    }

    fn config(iterations: u32) -> EpisimConfig {
        EpisimConfig {
            calibration_parameter: 0.000_1,
            initial_infections: 3,
            iterations,
            ..EpisimConfig::default()
        }
    }

    fn run(seed: u64, config: EpisimConfig, events: Vec<MobilityEvent>) -> Context {
        let mut context = Context::new();
        context.init_random(seed);
        context.init_episim(config).unwrap();
        context.load_mobility_events(events).unwrap();
        context.start_simulation().unwrap();
        context.execute().unwrap();
        context
    }

    fn assert_membership_consistent(context: &Context) {
        let population = context.get_population().unwrap();
        let mut members = 0;
        for container in population.containers() {
            for person in container.members() {
                assert_eq!(
                    population.person(person).unwrap().current_container(),
                    Some(container.id()),
                    "person {person} listed in {} but not inside it",
                    container.name()
                );
                members += 1;
            }
        }
        let inside = population
            .persons()
            .filter(|person| person.current_container().is_some())
            .count();
        assert_eq!(members, inside);
    }

    #[test]
    fn membership_stays_consistent_across_days() {
        let mut context = Context::new();
        context.init_random(42);
        context.init_episim(config(12)).unwrap();
        context.load_mobility_events(commuters()).unwrap();
        context.start_simulation().unwrap();
        // Check every quarter day, after whatever else runs at that instant.
        for quarter in 1..48 {
            context.add_plan_with_phase(
                f64::from(quarter) * SECONDS_PER_DAY / 4.0,
                |context| {
                    assert_membership_consistent(context);
                    Ok(())
                },
                ExecutionPhase::Last,
            );
        }
        context.execute().unwrap();
        assert_membership_consistent(&context);
        assert!(!context.get_infection_events().is_empty());
    }

    #[test]
    fn infected_persons_never_become_susceptible_again() {
        let context = run(7, config(30), commuters());
        let population = context.get_population().unwrap();
        for event in context.get_infection_events() {
            let person = population.find_person(&event.infected).unwrap();
            assert_ne!(
                population.person(person).unwrap().disease_status(),
                DiseaseStatus::Susceptible
            );
        }
        // Day 0 is reported before anybody has been seen.
        let reports = &context.get_daily_reports()[1..];
        assert!(reports.len() > 10);
        for pair in reports.windows(2) {
            assert!(pair[1].total_infected >= pair[0].total_infected);
            assert!(pair[1].susceptible <= pair[0].susceptible);
        }
    }

    #[test]
    fn same_seed_same_outcome() {
        let first = run(99, config(15), commuters());
        let second = run(99, config(15), commuters());
        assert_eq!(first.get_infection_events(), second.get_infection_events());
        assert_eq!(first.get_daily_reports(), second.get_daily_reports());
        assert_eq!(first.random_draw_count(), second.random_draw_count());
    }

    #[test]
    fn closing_an_unvisited_group_leaves_the_random_stream_alone() {
        let open = run(5, config(15), commuters());

        let mut closed_config = config(15);
        closed_config.policy.insert(
            "shopping".to_string(),
            vec![episim::config::RestrictionStep {
                day: 0,
                remaining_fraction: 0.0,
            }],
        );
        let closed = run(5, closed_config, commuters());

        let events: &[InfectionEvent] = open.get_infection_events();
        assert_eq!(events, closed.get_infection_events());
        assert_eq!(open.random_draw_count(), closed.random_draw_count());
        assert_eq!(
            closed.get_restrictions().unwrap().get("shopping"),
            Some(Restriction::closed())
        );
    }

    /// Runs the default contact dynamics and records, per leave, the candidate picks it should
    /// make next to the draws it actually took.
    struct DrawAudit {
        leaves: Rc<RefCell<Vec<(u64, u64)>>>,
    }

    impl TransmissionStrategy for DrawAudit {
        fn infection_dynamics(
            &self,
            context: &mut Context,
            leaving: PersonId,
            container: ContainerId,
            now: f64,
        ) -> Result<(), EpisimError> {
            let before = context.random_draw_count();
            let picks = if context.get_iteration() == 0
                || !context.person_is_relevant(leaving, container)?
            {
                0
            } else {
                let pool = context.get_container(container)?.member_count() - 1;
                contacts_to_sample(pool, context.get_episim_config()?.sample_size)
            };
            DefaultTransmission.infection_dynamics(context, leaving, container, now)?;
            let spent = context.random_draw_count() - before;
            self.leaves
                .borrow_mut()
                .push((u64::try_from(picks).unwrap(), spent));
            Ok(())
        }
    }

    /// Days 0 to 3 only: nobody seeded on day 1 is contagious yet, so no pair ever reaches
    /// the transmission draw and every draw of a leave is a candidate pick or a relevance check.
    fn audited_leaves(fractions: &[(&str, f64)]) -> Vec<(u64, u64)> {
        let mut config = config(4);
        for (group, remaining_fraction) in fractions {
            config.policy.insert(
                (*group).to_string(),
                vec![episim::config::RestrictionStep {
                    day: 0,
                    remaining_fraction: *remaining_fraction,
                }],
            );
        }
        let leaves = Rc::new(RefCell::new(Vec::new()));
        let mut context = Context::new();
        context.init_random(21);
        context.init_episim(config).unwrap();
        context.set_transmission_strategy(Rc::new(DrawAudit {
            leaves: Rc::clone(&leaves),
        }));
        context.load_mobility_events(commuters()).unwrap();
        context.start_simulation().unwrap();
        context.execute().unwrap();
        assert_eq!(context.get_iteration(), 3);
        leaves.take()
    }

    #[test]
    fn binding_restrictions_never_draw_over_a_run() {
        let leaves = audited_leaves(&[("home", 0.0), ("work", 1.0), ("pt", 1.0)]);
        assert!(!leaves.is_empty());
        for (picks, spent) in &leaves {
            assert_eq!(picks, spent);
        }
        assert!(leaves.iter().map(|(picks, _)| picks).sum::<u64>() > 0);
    }

    #[test]
    fn partial_restrictions_draw_for_relevance() {
        let leaves = audited_leaves(&[("work", 0.5)]);
        assert!(leaves.iter().any(|(picks, spent)| spent > picks));
    }

    #[test]
    fn closing_everything_stops_transmission() {
        let mut config = config(10);
        for group in ["home", "work", "pt"] {
            config.policy.insert(
                group.to_string(),
                vec![episim::config::RestrictionStep {
                    day: 0,
                    remaining_fraction: 0.0,
                }],
            );
        }
        let context = run(5, config, commuters());
        assert!(context.get_infection_events().is_empty());
        let report = context.get_infection_report().unwrap();
        assert_eq!(report.total_infected, 3);
    }

    #[test]
    fn last_activity_hands_over_to_first_at_midnight() {
        let events = vec![
            MobilityEvent::activity_end(20_000.0, "a", "home", "home_1"),
            MobilityEvent::activity_start(25_000.0, "a", "work", "work_1"),
            MobilityEvent::activity_end(40_000.0, "a", "work", "work_1"),
            MobilityEvent::activity_start(45_000.0, "a", "leisure", "leisure_1"),
        ];
        let mut context = Context::new();
        context.init_random(1);
        context
            .init_episim(EpisimConfig {
                initial_infections: 1,
                iterations: 4,
                ..EpisimConfig::default()
            })
            .unwrap();
        context.load_mobility_events(events).unwrap();
        context.start_simulation().unwrap();

        let checked = Rc::new(RefCell::new(Vec::new()));
        for day in 1..4 {
            let checked = Rc::clone(&checked);
            let midnight = f64::from(day) * SECONDS_PER_DAY;
            context.add_plan(midnight, move |context| {
                let population = context.get_population().unwrap();
                let person = population.find_person("a").unwrap();
                let home = population.find_container("home_1", ContainerKind::Facility).unwrap();
                let leisure = population
                    .find_container("leisure_1", ContainerKind::Facility)
                    .unwrap();
                assert_eq!(population.person(person).unwrap().current_container(), Some(home));
                assert_eq!(population.container(home).unwrap().entering_time(person), Some(midnight));
                assert!(!population.container(leisure).unwrap().contains(person));
                checked.borrow_mut().push(day);
                Ok(())
            });
        }
        context.execute().unwrap();

        assert_eq!(*checked.borrow(), vec![1, 2, 3]);
        let population = context.get_population().unwrap();
        let person = population.find_person("a").unwrap();
        let record = population.person(person).unwrap();
        assert_eq!(record.trajectory(), ["home", "work", "work", "leisure"]);
        assert_eq!(record.first_facility(), population.find_container("home_1", ContainerKind::Facility));
        assert_eq!(
            record.current_container(),
            population.find_container("leisure_1", ContainerKind::Facility)
        );
    }

    #[test]
    fn stops_once_nobody_can_progress() {
        let context = run(
            3,
            EpisimConfig {
                initial_infections: 0,
                iterations: 50,
                ..EpisimConfig::default()
            },
            commuters(),
        );
        // Day 0, then day 1 finds nobody infected.
        assert_eq!(context.get_iteration(), 1);
        assert_eq!(context.get_daily_reports().len(), 2);
    }

    #[test]
    fn out_of_order_events_are_rejected() {
        let mut context = Context::new();
        context.init_random(1);
        context.init_episim(EpisimConfig::default()).unwrap();
        let events = vec![
            MobilityEvent::activity_end(30_000.0, "a", "home", "home_1"),
            MobilityEvent::activity_start(20_000.0, "a", "work", "work_1"),
        ];
        assert!(matches!(
            context.load_mobility_events(events),
            Err(EpisimError::ConfigError(_))
        ));
    }

    #[test]
    fn filtered_csv_runs_like_the_full_script() {
        let mut buffer = Vec::new();
        write_events(&mut buffer, &commuters()).unwrap();
        let events = read_events_from_reader(buffer.as_slice()).unwrap();
        assert_eq!(events, commuters());

        let filtered = EventFilter::new(["p0", "p10", "p20"])
            .apply(&events, FacilitiesHandling::Snz)
            .unwrap();
        assert_eq!(filtered.events.len(), 24);
        assert_eq!(
            filtered.facilities.iter().collect::<Vec<_>>(),
            vec!["home_0", "work_0", "work_2"]
        );

        let context = run(8, config(5), filtered.events);
        let population = context.get_population().unwrap();
        assert_eq!(population.person_count(), 3);
        assert_membership_consistent(&context);
    }
}
