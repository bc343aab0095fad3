mod notifier_handoff;
